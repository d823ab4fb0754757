//! Configuration types.
//!
//! Everything that varies per deployment lives here: the instrument
//! whitelist, the completeness policy, which records the win/loss commands
//! may target, and how cancellation is persisted.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::signal::normalize;

/// Recognized instrument tokens plus the fallback instrument.
///
/// Aliases map onto a canonical ticker (`GOLD` → `XAUUSD`). A canonical
/// ticker always maps to itself. Lookup keys are stored in normalized form
/// so they match normalized message text (`XAU_USD` is keyed as `XAU USD`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentTable {
    tokens: BTreeMap<String, String>,
    default_symbol: Option<String>,
}

impl InstrumentTable {
    pub fn new(default_symbol: Option<&str>) -> Self {
        let mut table = Self {
            tokens: BTreeMap::new(),
            default_symbol: None,
        };
        if let Some(symbol) = default_symbol {
            table.insert(symbol);
            table.default_symbol = Some(symbol.trim().to_uppercase());
        }
        table
    }

    /// Register a canonical instrument.
    pub fn insert(&mut self, symbol: &str) -> &mut Self {
        let symbol = symbol.trim().to_uppercase();
        let key = normalize(&symbol);
        if !key.is_empty() {
            self.tokens.insert(key.to_string(), symbol);
        }
        self
    }

    /// Register an alias token for a canonical instrument.
    pub fn alias(&mut self, alias: &str, canonical: &str) -> &mut Self {
        let alias = normalize(alias);
        if alias.is_empty() || normalize(canonical).is_empty() {
            return self;
        }
        self.insert(canonical);
        self.tokens
            .insert(alias.to_string(), canonical.trim().to_uppercase());
        self
    }

    /// Canonical instrument for a normalized token, if whitelisted.
    pub fn resolve(&self, token: &str) -> Option<&str> {
        self.tokens.get(token).map(String::as_str)
    }

    pub fn default_symbol(&self) -> Option<&str> {
        self.default_symbol.as_deref()
    }

    /// Distinct canonical instruments, alphabetical.
    pub fn symbols(&self) -> Vec<&str> {
        let symbols: BTreeSet<&str> = self.tokens.values().map(String::as_str).collect();
        symbols.into_iter().collect()
    }

    /// All recognized tokens, longest first so alternations prefer the
    /// most specific match.
    pub fn tokens(&self) -> Vec<&str> {
        let mut tokens: Vec<&str> = self.tokens.keys().map(String::as_str).collect();
        tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        tokens
    }

    /// Parse `XAUUSD,EURUSD,GOLD=XAUUSD`.
    pub fn parse_list(list: &str, default_symbol: Option<&str>) -> Result<Self, ConfigError> {
        let mut table = Self::new(default_symbol);
        for entry in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match entry.split_once('=') {
                Some((alias, canonical)) => {
                    if alias.trim().is_empty() || canonical.trim().is_empty() {
                        return Err(ConfigError::invalid(
                            "SIGNAL_INSTRUMENTS",
                            format!("malformed alias entry '{entry}'"),
                        ));
                    }
                    table.alias(alias, canonical);
                }
                None => {
                    table.insert(entry);
                }
            }
        }
        Ok(table)
    }
}

impl Default for InstrumentTable {
    fn default() -> Self {
        let mut table = Self::new(Some("XAUUSD"));
        table
            .insert("XAGUSD")
            .insert("EURUSD")
            .alias("GOLD", "XAUUSD");
        table
    }
}

/// Whether stop-loss and take-profit are required for a message to count
/// as a signal. Side and entry are always required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletenessPolicy {
    /// Missing SL or TP rejects the message.
    #[default]
    Strict,
    /// SL/TP may be absent; the record stores them as null.
    Lenient,
}

impl FromStr for CompletenessPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(ConfigError::invalid(
                "SIGNAL_COMPLETENESS",
                format!("expected 'strict' or 'lenient', got '{other}'"),
            )),
        }
    }
}

/// Which records the win/loss commands may close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkEligibility {
    OpenOnly,
    #[default]
    OpenOrPending,
}

impl FromStr for MarkEligibility {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::OpenOnly),
            "open_or_pending" => Ok(Self::OpenOrPending),
            other => Err(ConfigError::invalid(
                "SIGNAL_MARK_ELIGIBLE",
                format!("expected 'open' or 'open_or_pending', got '{other}'"),
            )),
        }
    }
}

/// How the cancel command persists its effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelMode {
    /// Keep the row with status `cancelled`.
    #[default]
    Soft,
    /// Remove the row.
    Delete,
}

impl FromStr for CancelMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soft" => Ok(Self::Soft),
            "delete" => Ok(Self::Delete),
            other => Err(ConfigError::invalid(
                "SIGNAL_CANCEL_MODE",
                format!("expected 'soft' or 'delete', got '{other}'"),
            )),
        }
    }
}

/// Inputs of the signal extractor.
#[derive(Debug, Clone, Default)]
pub struct ParserConfig {
    pub instruments: InstrumentTable,
    pub completeness: CompletenessPolicy,
}

/// Inputs of the record lifecycle manager.
#[derive(Debug, Clone, Default)]
pub struct LifecyclePolicy {
    pub mark_eligibility: MarkEligibility,
    pub cancel_mode: CancelMode,
}

/// Connection details for the PostgREST record store.
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    pub base_url: String,
    pub service_key: SecretString,
    pub table: String,
}

/// Process-level configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: String,
    pub rest_store: Option<RestStoreConfig>,
    pub telegram_token: Option<SecretString>,
    pub parser: ParserConfig,
    pub lifecycle: LifecyclePolicy,
    /// Extra words that trigger the help reply, besides `/START`.
    pub start_aliases: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("SIGNAL_LEDGER_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ConfigError::invalid("SIGNAL_LEDGER_PORT", format!("'{raw}' is not a port"))
            })?,
            None => 8080,
        };

        let db_path =
            lookup("SIGNAL_LEDGER_DB_PATH").unwrap_or_else(|| "./data/signals.db".to_string());

        let rest_store = match (lookup("SUPABASE_URL"), lookup("SUPABASE_SERVICE_ROLE")) {
            (Some(url), Some(key)) => Some(RestStoreConfig {
                base_url: url.trim().trim_end_matches('/').to_string(),
                service_key: SecretString::from(key),
                table: lookup("SUPABASE_TABLE").unwrap_or_else(|| "signals".to_string()),
            }),
            (Some(_), None) => {
                return Err(ConfigError::MissingEnvVar("SUPABASE_SERVICE_ROLE".into()));
            }
            _ => None,
        };

        let telegram_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);

        let default_symbol = match lookup("SIGNAL_DEFAULT_SYMBOL") {
            Some(raw) if raw.trim().eq_ignore_ascii_case("none") => None,
            Some(raw) if !raw.trim().is_empty() => Some(raw.trim().to_string()),
            _ => Some("XAUUSD".to_string()),
        };

        let instruments = match lookup("SIGNAL_INSTRUMENTS") {
            Some(list) => InstrumentTable::parse_list(&list, default_symbol.as_deref())?,
            None => {
                let mut table = InstrumentTable::default();
                table.default_symbol = default_symbol.as_deref().map(str::to_uppercase);
                if let Some(symbol) = default_symbol.as_deref() {
                    table.insert(symbol);
                }
                table
            }
        };

        let completeness: CompletenessPolicy = lookup("SIGNAL_COMPLETENESS")
            .map(|raw| raw.parse())
            .transpose()?
            .unwrap_or_default();
        let mark_eligibility: MarkEligibility = lookup("SIGNAL_MARK_ELIGIBLE")
            .map(|raw| raw.parse())
            .transpose()?
            .unwrap_or_default();
        let cancel_mode: CancelMode = lookup("SIGNAL_CANCEL_MODE")
            .map(|raw| raw.parse())
            .transpose()?
            .unwrap_or_default();

        let start_aliases = lookup("SIGNAL_START_ALIASES")
            .unwrap_or_else(|| "/HELP".to_string())
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            port,
            db_path,
            rest_store,
            telegram_token,
            parser: ParserConfig {
                instruments,
                completeness,
            },
            lifecycle: LifecyclePolicy {
                mark_eligibility,
                cancel_mode,
            },
            start_aliases,
        })
    }
}
