// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Selection of the account boundary over which usage is computed.
//!
//! A run targets exactly one enterprise or exactly one organization. The
//! selector is built from two optional inputs and rejects both the empty and
//! the ambiguous combination before any network traffic happens.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::error::Error;

/// Account and enterprise slugs accepted in API routes.
static ACCOUNT_NAME: LazyLock<Regex,> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?$",).expect("valid account pattern",)
},);

/// Boundary over which actions usage is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
#[serde(rename_all = "snake_case")]
pub enum Scope
{
    /// Every organization inside a GitHub enterprise.
    Enterprise(String,),
    /// A single organization or user account.
    Owner(String,),
}

impl Scope
{
    /// Builds the selector from the optional `enterprise` and `owner` inputs.
    ///
    /// Blank values count as absent, matching how workflow inputs arrive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when neither or both inputs are set,
    /// or when the selected name is not a valid account slug.
    ///
    /// # Examples
    ///
    /// ```
    /// use actions_usage::Scope;
    ///
    /// let scope = Scope::select(None, Some("acme",),)?;
    /// assert_eq!(scope, Scope::Owner("acme".to_owned(),));
    /// assert!(Scope::select(Some("acme-ent",), Some("acme",),).is_err());
    /// # Ok::<(), actions_usage::Error>(())
    /// ```
    pub fn select(enterprise: Option<&str,>, owner: Option<&str,>,) -> Result<Self, Error,>
    {
        let enterprise = enterprise.map(str::trim,).filter(|value| !value.is_empty(),);
        let owner = owner.map(str::trim,).filter(|value| !value.is_empty(),);

        let scope = match (enterprise, owner,) {
            (None, None,) => {
                return Err(Error::configuration("One of enterprise, owner is required",),);
            }
            (Some(_,), Some(_,),) => {
                return Err(Error::configuration("Can only use one of enterprise, owner",),);
            }
            (Some(enterprise,), None,) => Self::Enterprise(enterprise.to_owned(),),
            (None, Some(owner,),) => Self::Owner(owner.to_owned(),),
        };

        if !ACCOUNT_NAME.is_match(scope.name(),) {
            return Err(Error::configuration(format!(
                "{} '{}' is not a valid account name",
                scope.kind(),
                scope.name()
            ),),);
        }

        Ok(scope,)
    }

    /// Returns the enterprise slug or owner login.
    pub fn name(&self,) -> &str
    {
        match self {
            Self::Enterprise(name,) | Self::Owner(name,) => name,
        }
    }

    /// Returns the input name that selected this scope.
    pub fn kind(&self,) -> &'static str
    {
        match self {
            Self::Enterprise(_,) => "enterprise",
            Self::Owner(_,) => "owner",
        }
    }
}

impl fmt::Display for Scope
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        write!(f, "{} {}", self.kind(), self.name())
    }
}
