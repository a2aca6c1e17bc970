//! Terminal front end for the casabot orchestrator agent.
//!
//! ## Provider bootstrap
//!
//! Providers come from `casabot.json` in the casabot home (`$CASABOT_HOME`,
//! default `~/casabot`). `activeProvider` names the one to use; when it is
//! empty the provider flagged `isDefault` is chosen.
//!
//! `CASABOT_PROVIDER` overrides the selection by name. `CASABOT_PROVIDER=mock`
//! runs against the offline scripted provider and needs no config at all.
//!
//! Diagnostics go to stderr, filtered by `CASABOT_LOG` (default `warn`).

pub mod app;
pub mod commands;
pub mod config;
pub mod logging;
pub mod providers;
pub mod runtime;
