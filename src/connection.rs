//! Finding a Galaxy URL that answers from inside the container.
//!
//! Galaxy is reached through the Docker host, which is the container's
//! default gateway. Two candidates are tried in order:
//!
//! 1. `GALAXY_URL` with `$DOCKER_HOST` replaced by the gateway IP.
//! 2. `http://<gateway>:<GALAXY_WEB_PORT>/<path of GALAXY_URL>`, which gets
//!    around proxies (REMOTE_USER setups, uWSGI) that block API calls on the
//!    user-facing URL.
//!
//! Each candidate is probed with a history lookup. Failures are kept as
//! [`ProbeFailure`]s so callers can see why every attempt was rejected.

use std::net::Ipv4Addr;
use std::process::Command;

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GalaxyConfig;
use crate::galaxy::{ApiError, GalaxyApi, GalaxyClient};

const ROUTE_TABLE: &str = "/proc/net/route";

/// Why a candidate URL was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub url: String,
    pub reason: String,
}

/// Result of probing one candidate URL.
#[derive(Debug)]
pub enum ProbeOutcome<H> {
    Connected(H),
    Failed(ProbeFailure),
}

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("No port")]
    NoPort { attempts: Vec<ProbeFailure> },

    #[error(
        "Could not connect to a galaxy instance. Please contact your SysAdmin for help with this error"
    )]
    Unreachable { attempts: Vec<ProbeFailure> },
}

impl ConnectError {
    pub fn attempts(&self) -> &[ProbeFailure] {
        match self {
            ConnectError::NoPort { attempts } | ConnectError::Unreachable { attempts } => attempts,
        }
    }
}

/// A handle that passed its probe, plus the failures seen before it.
#[derive(Debug)]
pub struct Connection<H> {
    pub handle: H,
    pub url: String,
    pub attempts: Vec<ProbeFailure>,
}

/// Default gateway of the container, i.e. the Docker host.
pub fn detect_host_ip() -> Option<String> {
    let ip = gateway_from_netstat().or_else(gateway_from_route_table);
    debug!(host_ip = ?ip, "host IP determined");
    ip
}

fn gateway_from_netstat() -> Option<String> {
    let netstat = which::which("netstat").ok()?;
    let output = Command::new(netstat).arg("-nr").output().ok()?;
    if !output.status.success() {
        return None;
    }
    parse_netstat_gateway(&String::from_utf8_lossy(&output.stdout))
}

fn gateway_from_route_table() -> Option<String> {
    let table = std::fs::read_to_string(ROUTE_TABLE).ok()?;
    parse_route_table_gateway(&table)
}

/// Gateway column of the `0.0.0.0` line in `netstat -nr` output.
pub fn parse_netstat_gateway(table: &str) -> Option<String> {
    table
        .lines()
        .filter(|line| line.starts_with("0.0.0.0"))
        .find_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
}

/// Gateway of the default route in `/proc/net/route` (hex, host byte order).
pub fn parse_route_table_gateway(table: &str) -> Option<String> {
    table.lines().skip(1).find_map(|line| {
        let mut cols = line.split_whitespace();
        let _iface = cols.next()?;
        let destination = cols.next()?;
        let gateway = cols.next()?;
        if destination != "00000000" {
            return None;
        }
        let raw = u32::from_str_radix(gateway, 16).ok()?;
        Some(Ipv4Addr::from(raw.to_le_bytes()).to_string())
    })
}

static DOCKER_HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(?:\{DOCKER_HOST\}|DOCKER_HOST\b)").expect("docker host placeholder regex")
});

/// Replace `$DOCKER_HOST` / `${DOCKER_HOST}` in `template`. Other `$` text is left alone,
/// as is the placeholder itself when no IP is known.
pub fn substitute_host(template: &str, host_ip: Option<&str>) -> String {
    let Some(ip) = host_ip else {
        return template.to_string();
    };
    DOCKER_HOST_RE.replace_all(template, NoExpand(ip)).into_owned()
}

/// Application path of a Galaxy URL: everything after `scheme://authority/`.
pub fn app_path(galaxy_url: &str) -> String {
    galaxy_url
        .trim_end_matches('/')
        .split('/')
        .skip(3)
        .collect::<Vec<_>>()
        .join("/")
}

/// URL built from the gateway, Galaxy's web port and the app path.
pub fn fallback_url(host_ip: &str, port: &str, app_path: &str) -> String {
    format!("http://{}:{}/{}", host_ip.trim(), port.trim(), app_path.trim())
        .trim_end_matches('/')
        .to_string()
}

/// Connect to `url` and check that `history_id` can be fetched through it.
pub fn probe<H, F>(url: &str, history_id: &str, connect: &mut F) -> ProbeOutcome<H>
where
    H: GalaxyApi,
    F: FnMut(&str) -> Result<H, ApiError>,
{
    debug!(url, "probing galaxy url");
    let checked = connect(url).and_then(|handle| handle.show_history(history_id).map(|_| handle));
    match checked {
        Ok(handle) => {
            debug!(url, state = "success", "probe finished");
            ProbeOutcome::Connected(handle)
        }
        Err(err) => {
            debug!(url, state = "failure", error = %err, "probe finished");
            ProbeOutcome::Failed(ProbeFailure {
                url: url.to_string(),
                reason: err.to_string(),
            })
        }
    }
}

/// Try the configured URL, then the auto-detected one.
pub fn resolve_with<H, F>(
    config: &GalaxyConfig,
    history_id: &str,
    host_ip: Option<&str>,
    mut connect: F,
) -> Result<Connection<H>, ConnectError>
where
    H: GalaxyApi,
    F: FnMut(&str) -> Result<H, ApiError>,
{
    let mut attempts = Vec::new();

    let configured = substitute_host(&config.galaxy_url, host_ip);
    match probe(&configured, history_id, &mut connect) {
        ProbeOutcome::Connected(handle) => {
            return Ok(Connection {
                handle,
                url: configured,
                attempts,
            });
        }
        ProbeOutcome::Failed(failure) => attempts.push(failure),
    }

    let Some(port) = config.web_port.as_deref() else {
        return Err(ConnectError::NoPort { attempts });
    };

    let path = app_path(&config.galaxy_url);
    let Some(ip) = host_ip else {
        attempts.push(ProbeFailure {
            url: fallback_url("<unknown>", port, &path),
            reason: "could not determine the Docker host IP".to_string(),
        });
        return Err(ConnectError::Unreachable { attempts });
    };

    let detected = fallback_url(ip, port, &path);
    match probe(&detected, history_id, &mut connect) {
        ProbeOutcome::Connected(handle) => Ok(Connection {
            handle,
            url: detected,
            attempts,
        }),
        ProbeOutcome::Failed(failure) => {
            attempts.push(failure);
            Err(ConnectError::Unreachable { attempts })
        }
    }
}

/// Resolve a working [`GalaxyClient`] for `history_id`.
pub fn resolve(
    config: &GalaxyConfig,
    history_id: &str,
) -> Result<Connection<GalaxyClient>, ConnectError> {
    let host_ip = detect_host_ip();
    let result = resolve_with(config, history_id, host_ip.as_deref(), |url| {
        GalaxyClient::new(url, &config.api_key)
    });
    if let Err(err) = &result {
        for attempt in err.attempts() {
            warn!(url = %attempt.url, reason = %attempt.reason, "galaxy url rejected");
        }
    }
    result
}
