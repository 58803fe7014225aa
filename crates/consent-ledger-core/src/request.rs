//! Invocation arguments: parsing and validation.
//!
//! All checks here run before any store access. A request that parses is
//! well-formed: every field is non-empty, free of the reserved key
//! separator, and lowercased.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::scope::{Scope, FIELD_SEPARATOR};

/// Arity of an access check: role, start, end, columns, access type, watchdog.
pub const ACCESS_QUERY_ARITY: usize = 6;

/// Arity of a consent update: user, action, then the access-check arguments.
pub const CONSENT_UPDATE_ARITY: usize = 8;

/// Arity of a rich query: selector.
pub const QUERY_ARITY: usize = 1;

/// Arity of a paged rich query: selector, page size, bookmark.
pub const PAGED_QUERY_ARITY: usize = 3;

/// Separator between column ids inside one argument.
const COLUMN_SEPARATOR: char = ',';

/// Grant or revoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentAction {
    Grant,
    Revoke,
}

impl FromStr for ConsentAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "g" | "grant" => Ok(ConsentAction::Grant),
            "r" | "revoke" => Ok(ConsentAction::Revoke),
            _ => Err(CoreError::InvalidAction(s.to_string())),
        }
    }
}

impl fmt::Display for ConsentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsentAction::Grant => f.write_str("grant"),
            ConsentAction::Revoke => f.write_str("revoke"),
        }
    }
}

/// The five scope attributes shared by every column of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeTemplate {
    pub role_id: String,
    pub start_date: String,
    pub end_date: String,
    pub access_type: String,
    pub watchdog_id: String,
}

impl ScopeTemplate {
    /// Validate and lowercase the shared scope attributes.
    pub fn new(
        role_id: &str,
        start_date: &str,
        end_date: &str,
        access_type: &str,
        watchdog_id: &str,
    ) -> Result<Self> {
        Ok(Self {
            role_id: field(1, "role", role_id)?,
            start_date: field(2, "start date", start_date)?,
            end_date: field(3, "end date", end_date)?,
            access_type: field(5, "access type", access_type)?,
            watchdog_id: field(6, "watchdog id", watchdog_id)?,
        })
    }

    /// The full scope for one column.
    pub fn scope(&self, column_id: &str) -> Scope {
        Scope::new(
            column_id,
            &self.role_id,
            &self.start_date,
            &self.end_date,
            &self.access_type,
            &self.watchdog_id,
        )
    }
}

/// A validated access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessQuery {
    pub template: ScopeTemplate,
    /// Lowercased column ids, in argument order.
    pub column_ids: Vec<String>,
}

impl AccessQuery {
    /// Build from a template and a comma-separated column list.
    pub fn new(template: ScopeTemplate, column_ids: &str) -> Result<Self> {
        Ok(Self {
            template,
            column_ids: parse_columns(4, column_ids)?,
        })
    }

    /// Parse positional arguments:
    /// role, start date, end date, column ids, access type, watchdog id.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        check_arity(args, ACCESS_QUERY_ARITY)?;
        let arg = |i: usize| args[i].as_ref();

        let template = ScopeTemplate::new(arg(0), arg(1), arg(2), arg(4), arg(5))?;
        Self::new(template, arg(3))
    }

    /// One scope per column id, in argument order.
    pub fn scopes(&self) -> impl Iterator<Item = Scope> + '_ {
        self.column_ids.iter().map(|c| self.template.scope(c))
    }

    /// Reject column lists longer than `limit`.
    pub fn check_column_limit(&self, limit: usize) -> Result<()> {
        if self.column_ids.len() > limit {
            return Err(CoreError::TooManyColumns {
                got: self.column_ids.len(),
                limit,
            });
        }
        Ok(())
    }
}

/// A validated grant or revoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentUpdate {
    /// Lowercased user id.
    pub user_id: String,
    pub action: ConsentAction,
    pub access: AccessQuery,
}

impl ConsentUpdate {
    /// Build from parts.
    pub fn new(user_id: &str, action: ConsentAction, access: AccessQuery) -> Result<Self> {
        Ok(Self {
            user_id: field(1, "user id", user_id)?,
            action,
            access,
        })
    }

    /// Parse positional arguments:
    /// user id, action, role, start date, end date, column ids, access type,
    /// watchdog id.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        check_arity(args, CONSENT_UPDATE_ARITY)?;
        let arg = |i: usize| args[i].as_ref();

        let action_arg = arg(1);
        if action_arg.is_empty() {
            return Err(CoreError::EmptyArgument {
                position: 2,
                name: "action",
            });
        }
        let action = action_arg.parse()?;

        let template = ScopeTemplate::new(arg(2), arg(3), arg(4), arg(6), arg(7))
            .map_err(|e| shift_position(e, 2))?;
        let access = AccessQuery::new(template, arg(5)).map_err(|e| shift_position(e, 2))?;

        Self::new(arg(0), action, access)
    }

    /// One scope per column id, in argument order.
    pub fn scopes(&self) -> impl Iterator<Item = Scope> + '_ {
        self.access.scopes()
    }
}

/// Parse the single selector argument of a rich query.
///
/// Selectors never become key fields, so the reserved separator is allowed.
pub fn selector_from_args<S: AsRef<str>>(args: &[S]) -> Result<String> {
    check_arity(args, QUERY_ARITY)?;
    selector(args[0].as_ref())
}

/// A validated paged rich query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedQuery {
    pub selector: String,
    pub page_size: usize,
    /// Resume after this key. `None` starts from the beginning.
    pub bookmark: Option<String>,
}

impl PagedQuery {
    /// Parse positional arguments: selector, page size, bookmark.
    ///
    /// The bookmark may be empty. It is a previously returned key and is
    /// passed through as-is.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        check_arity(args, PAGED_QUERY_ARITY)?;
        let selector = selector(args[0].as_ref())?;

        let raw_size = args[1].as_ref();
        if raw_size.is_empty() {
            return Err(CoreError::EmptyArgument {
                position: 2,
                name: "page size",
            });
        }
        let page_size = match raw_size.trim().parse::<usize>() {
            Ok(size) if size > 0 => size,
            _ => return Err(CoreError::InvalidPageSize(raw_size.to_string())),
        };

        let bookmark = Some(args[2].as_ref())
            .filter(|b| !b.is_empty())
            .map(String::from);

        Ok(Self {
            selector,
            page_size,
            bookmark,
        })
    }
}

fn selector(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(CoreError::EmptyArgument {
            position: 1,
            name: "selector",
        });
    }
    Ok(raw.to_string())
}

fn check_arity<S: AsRef<str>>(args: &[S], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(CoreError::WrongArity {
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn field(position: usize, name: &'static str, value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(CoreError::EmptyArgument { position, name });
    }
    if value.contains(FIELD_SEPARATOR) {
        return Err(CoreError::ReservedCharacter {
            name,
            separator: FIELD_SEPARATOR,
        });
    }
    Ok(value.to_lowercase())
}

fn parse_columns(position: usize, raw: &str) -> Result<Vec<String>> {
    if raw.is_empty() {
        return Err(CoreError::EmptyArgument {
            position,
            name: "column ids",
        });
    }
    raw.split(COLUMN_SEPARATOR)
        .map(|column| {
            let column = column.trim();
            if column.is_empty() {
                return Err(CoreError::EmptyColumnId);
            }
            field(position, "column id", column)
        })
        .collect()
}

// Update arguments sit two slots after the access-check arguments.
fn shift_position(err: CoreError, by: usize) -> CoreError {
    match err {
        CoreError::EmptyArgument { position, name } => CoreError::EmptyArgument {
            position: position + by,
            name,
        },
        other => other,
    }
}
