use std::sync::Mutex;

use async_trait::async_trait;
use gpcam_lib::GpError;
use gpcam_lib::wifi::{JOIN_TIMEOUT, NetworkJoin, wait_for_connection};
use tokio::process::Command;
use tracing::debug;

/// Joins the camera's access point through NetworkManager's `nmcli`.
pub struct NmcliJoin {
    active_ssid: Mutex<Option<String>>,
}

impl NmcliJoin {
    pub fn new() -> Self {
        Self {
            active_ssid: Mutex::new(None),
        }
    }
}

async fn nmcli(args: &[&str]) -> Result<std::process::Output, GpError> {
    debug!(?args, "nmcli");
    let output = Command::new("nmcli").args(args).output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GpError::Transport(format!(
            "nmcli {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }
    Ok(output)
}

/// Split one terse-mode (`-t`) nmcli row into fields. Terse mode
/// backslash-escapes `:` and `\` inside values, so a plain split would break
/// on SSIDs containing colons.
fn split_terse(line: &str) -> Vec<String> {
    let mut fields = vec![String::new()];
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    fields.last_mut().unwrap().push(escaped);
                }
            }
            ':' => fields.push(String::new()),
            _ => fields.last_mut().unwrap().push(c),
        }
    }
    fields
}

/// A terse-mode `active:ssid:security` row counts as established when it is
/// active, matches the SSID, and its security is known.
fn is_established(line: &str, ssid: &str) -> bool {
    let fields = split_terse(line);
    let [active, name, security] = fields.as_slice() else {
        return false;
    };
    active == "yes"
        && name == ssid
        && !security.is_empty()
        && !security.eq_ignore_ascii_case("unknown")
}

#[async_trait]
impl NetworkJoin for NmcliJoin {
    async fn connect(
        &self,
        interface: Option<&str>,
        ssid: &str,
        password: &str,
    ) -> Result<(), GpError> {
        let mut args = vec![
            "device", "wifi", "connect", ssid, "password", password, "hidden", "yes",
        ];
        if let Some(iface) = interface {
            args.extend_from_slice(&["ifname", iface]);
        }
        nmcli(&args).await?;

        // Joined is not established: wait until the host reports the SSID as
        // an active connection with known security.
        wait_for_connection(JOIN_TIMEOUT, || async {
            let output = nmcli(&["-t", "-f", "active,ssid,security", "device", "wifi"]).await?;
            let table = String::from_utf8_lossy(&output.stdout);
            Ok(table.lines().any(|line| is_established(line, ssid)))
        })
        .await?;

        *self.active_ssid.lock().unwrap() = Some(ssid.to_string());
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), GpError> {
        let ssid = self.active_ssid.lock().unwrap().take();
        if let Some(ssid) = ssid {
            nmcli(&["connection", "down", "id", &ssid]).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{is_established, split_terse};

    #[test]
    fn active_known_security_row_is_established() {
        assert!(is_established("yes:GP26123456:WPA2", "GP26123456"));
    }

    #[test]
    fn inactive_or_foreign_rows_are_not() {
        assert!(!is_established("no:GP26123456:WPA2", "GP26123456"));
        assert!(!is_established("yes:SomeOther:WPA2", "GP26123456"));
        assert!(!is_established("yes:GP26123456:unknown", "GP26123456"));
        assert!(!is_established("yes:GP26123456:", "GP26123456"));
    }

    #[test]
    fn terse_rows_unescape_colons_and_backslashes() {
        assert_eq!(split_terse(r"yes:a\:b:WPA2"), vec!["yes", "a:b", "WPA2"]);
        assert_eq!(split_terse(r"yes:a\\b:WPA2"), vec!["yes", r"a\b", "WPA2"]);
        assert_eq!(split_terse("yes::WPA2"), vec!["yes", "", "WPA2"]);
    }

    #[test]
    fn escaped_colon_in_ssid_does_not_shift_the_security_column() {
        assert!(is_established(r"yes:GP\:1234:WPA2", "GP:1234"));
        // An SSID ending in an escaped colon must not be mistaken for a
        // security value.
        assert!(!is_established(r"yes:GP1234\:unknown:WPA2", "GP1234"));
        assert!(!is_established(r"yes:GP\:1234:unknown", "GP:1234"));
    }
}
