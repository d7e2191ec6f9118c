use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use colored::{ColoredString, Colorize};

use certconsole::AppError;
use certconsole::error::Result;
use certconsole::models::certificate::{CertificateUpdate, NewCertificate, parse_date};
use certconsole::models::filter::Sort;
use certconsole::models::user::{NewUser, UserUpdate};
use certconsole::pages::list_page::{Notice, Severity};
use certconsole::routes::MenuItem;
use certconsole::views::table::{self, Row, RowTone, TableFooter};

/// certconsole - terminal console for the certificate backend
#[derive(Parser, Debug)]
#[command(name = "certconsole")]
#[command(version)]
#[command(about = "Manage certificates and user accounts", long_about = None)]
pub struct Cli {
    /// Backend URL (e.g., https://certs.example.com)
    #[arg(long = "api-url", env = "CERTCONSOLE_API_URL", global = true)]
    pub api_url: Option<String>,

    /// File the session token is kept in
    #[arg(long = "token-file", env = "CERTCONSOLE_TOKEN_FILE", global = true)]
    pub token_file: Option<PathBuf>,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and keep the session token
    Login {
        username: String,
        /// Password (prompted for when absent)
        #[arg(long, env = "CERTCONSOLE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and forget the session token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show the navigation menu for the signed-in user
    Menu,
    /// Certificates
    Certs {
        #[command(subcommand)]
        action: CertAction,
    },
    /// User accounts (administrators only)
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Browse a list interactively, with live search and filters
    Browse {
        /// Location to open
        #[arg(default_value = "/certificates")]
        path: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CertAction {
    /// List certificates
    List(ListArgs),
    /// Create a certificate
    Create(CertificateArgs),
    /// Update a certificate
    Update {
        id: i64,
        #[command(flatten)]
        fields: CertificateArgs,
    },
    /// Delete a certificate, immediately
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
    /// List users
    List(ListArgs),
    /// Create a user
    Create(UserArgs),
    /// Update a user
    Update {
        id: i64,
        #[command(flatten)]
        fields: UserArgs,
    },
    /// Delete a user, after confirming their id number
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Revoke every token of a user
    Revoke { id: i64 },
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Free-text search
    #[arg(long)]
    pub search: Option<String>,
    /// Field filter, as field=value (repeatable)
    #[arg(long = "filter", value_parser = parse_key_val)]
    pub filters: Vec<(String, String)>,
    /// Sort, as field or field,asc|desc
    #[arg(long)]
    pub sort: Option<Sort>,
    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pub pages: u32,
}

#[derive(Args, Debug, Default)]
pub struct CertificateArgs {
    #[arg(long = "id-demand")]
    pub id_demand: Option<String>,
    #[arg(long = "demande-name")]
    pub demande_name: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long = "type")]
    pub cert_type: Option<String>,
    #[arg(long = "organizational-unit")]
    pub organizational_unit: Option<String>,
    #[arg(long = "common-name")]
    pub common_name: Option<String>,
    /// DD-MM-YYYY or YYYY-MM-DD
    #[arg(long = "creation-date")]
    pub creation_date: Option<String>,
    /// DD-MM-YYYY or YYYY-MM-DD
    #[arg(long = "expiration-date")]
    pub expiration_date: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct UserArgs {
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long, env = "CERTCONSOLE_NEW_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    #[arg(long)]
    pub firstname: Option<String>,
    #[arg(long)]
    pub lastname: Option<String>,
    #[arg(long = "id-number")]
    pub id_number: Option<String>,
    /// USER, ADMIN or SUPER_ADMIN
    #[arg(long)]
    pub role: Option<String>,
    /// ACTIVE, SUSPENDED or DELETED
    #[arg(long)]
    pub status: Option<String>,
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected field=value, got '{}'", s))
}

fn date_arg(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_date(raw)
            .map(Some)
            .ok_or_else(|| AppError::invalid(field, format!("'{}' is not a date", raw))),
    }
}

impl CertificateArgs {
    pub fn into_new(self) -> Result<NewCertificate> {
        Ok(NewCertificate {
            creation_date: date_arg("creationDate", self.creation_date.as_deref())?,
            expiration_date: date_arg("expirationDate", self.expiration_date.as_deref())?,
            id_demand: self.id_demand.unwrap_or_default(),
            demande_name: self.demande_name.unwrap_or_default(),
            model: self.model.unwrap_or_default(),
            cert_type: self.cert_type.unwrap_or_default(),
            organizational_unit: self.organizational_unit.filter(|ou| !ou.trim().is_empty()),
            common_name: self.common_name.unwrap_or_default(),
        })
    }

    /// Overrides the given fields of a pre-filled update.
    pub fn apply_to(self, update: &mut CertificateUpdate) -> Result<()> {
        if let Some(date) = date_arg("creationDate", self.creation_date.as_deref())? {
            update.creation_date = Some(date);
        }
        if let Some(date) = date_arg("expirationDate", self.expiration_date.as_deref())? {
            update.expiration_date = Some(date);
        }
        if self.id_demand.is_some() {
            return Err(AppError::invalid("idDemand", "The demand of a certificate cannot change"));
        }
        if let Some(v) = self.demande_name {
            update.demande_name = v;
        }
        if let Some(v) = self.model {
            update.model = v;
        }
        if let Some(v) = self.cert_type {
            update.cert_type = v;
        }
        if let Some(v) = self.organizational_unit {
            update.organizational_unit = Some(v).filter(|ou| !ou.trim().is_empty());
        }
        if let Some(v) = self.common_name {
            update.common_name = v;
        }
        Ok(())
    }
}

impl UserArgs {
    pub fn into_new(self) -> Result<NewUser> {
        Ok(NewUser {
            role: self.role.as_deref().map(str::parse).transpose()?,
            status: self.status.as_deref().map(str::parse).transpose()?,
            username: self.username.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            firstname: self.firstname.unwrap_or_default(),
            lastname: self.lastname.unwrap_or_default(),
            id_number: self.id_number.unwrap_or_default(),
        })
    }

    /// Overrides the given fields of a pre-filled update.
    pub fn apply_to(self, update: &mut UserUpdate) -> Result<()> {
        if let Some(role) = self.role.as_deref() {
            update.role = Some(role.parse()?);
        }
        if let Some(status) = self.status.as_deref() {
            update.status = Some(status.parse()?);
        }
        if let Some(password) = self.password.as_deref() {
            update.set_password(password);
        }
        if let Some(v) = self.username {
            update.username = v;
        }
        if let Some(v) = self.email {
            update.email = v;
        }
        if let Some(v) = self.firstname {
            update.firstname = v;
        }
        if let Some(v) = self.lastname {
            update.lastname = v;
        }
        if let Some(v) = self.id_number {
            update.id_number = v;
        }
        Ok(())
    }
}

fn paint(text: &str, tone: RowTone) -> ColoredString {
    match tone {
        RowTone::Normal => text.normal(),
        RowTone::Warning => text.yellow(),
        RowTone::Danger => text.red(),
        RowTone::Muted => text.dimmed(),
    }
}

/// Prints rows as an aligned table, highlighted by tone.
pub fn print_table<T: Row>(items: &[T], sort: &Sort, footer: TableFooter, error: Option<&str>, today: NaiveDate) {
    let rows = table::render(items, today);

    let headers: Vec<String> = T::COLUMNS
        .iter()
        .map(|c| match table::sort_indicator(c, sort) {
            Some(arrow) => format!("{} {}", c.header, arrow),
            None => c.header.to_string(),
        })
        .collect();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(&row.cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(&headers).bold());
    for row in &rows {
        let actions = row
            .actions
            .iter()
            .map(|a| a.label())
            .collect::<Vec<_>>()
            .join(", ");
        println!("{}  {}", paint(&line(&row.cells), row.tone), format!("[{}]", actions).dimmed());
    }

    if let Some(error) = error {
        eprintln!("{}", error.red());
    }
    match footer {
        TableFooter::Loading => println!("{}", "Loading...".dimmed()),
        TableFooter::Empty => println!("{}", "No rows found.".dimmed()),
        TableFooter::LoadMore => println!("{}", format!("{} rows, more available", rows.len()).dimmed()),
        TableFooter::AllLoaded => println!("{}", format!("{} rows, all loaded", rows.len()).dimmed()),
    }
}

pub fn print_notice(notice: &Notice) {
    match notice.severity {
        Severity::Success => println!("{} {}", "✓".green().bold(), notice.message),
        Severity::Error => {
            eprintln!("{} {}", "✗".red().bold(), notice.message.red());
            if let Some(fields) = &notice.field_errors {
                for (field, message) in fields {
                    eprintln!("  {}: {}", field.yellow(), message);
                }
            }
        }
    }
}

pub fn print_menu(items: &[MenuItem]) {
    for item in items {
        println!("{:<18} {}", item.label.bold(), item.path.dimmed());
    }
}

pub const BROWSE_HELP: &str = "\
/text          search (runs after a short pause)
!              search now
f field=value  edit a filter (runs after a short pause)
apply          apply the filters now
sort field [asc|desc]
more           load the next page
reset          clear filters and search
q              quit";
