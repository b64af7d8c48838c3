pub const ENV_SANDBOXED: &str = "X07_OS_SANDBOXED";
pub const ENV_RPC: &str = "X07_OS_RPC";
pub const ENV_RPC_SEND_CHUNK_BYTES: &str = "X07_OS_RPC_SEND_CHUNK_BYTES";
pub const ENV_RPC_MAX_MESSAGE_BYTES: &str = "X07_OS_RPC_MAX_MESSAGE_BYTES";

const SANDBOXED_MAX_MESSAGE_BYTES: u32 = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcPolicy {
    /// Whether the host may submit batches at all.
    pub enabled: bool,
    /// Outbound payloads are copied in chunks of at most this many bytes.
    /// Zero keeps each payload in one chunk.
    pub send_chunk_bytes: u32,
    /// Largest outbound payload accepted. Zero means unlimited.
    pub max_message_bytes: u32,
}

impl Default for RpcPolicy {
    fn default() -> Self {
        RpcPolicy {
            enabled: true,
            send_chunk_bytes: 0,
            max_message_bytes: 0,
        }
    }
}

impl RpcPolicy {
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let sandboxed = parse_bool(lookup(ENV_SANDBOXED)).unwrap_or(false);
        RpcPolicy {
            enabled: parse_bool(lookup(ENV_RPC)).unwrap_or(!sandboxed),
            send_chunk_bytes: parse_u32(lookup(ENV_RPC_SEND_CHUNK_BYTES)).unwrap_or(0),
            max_message_bytes: parse_u32(lookup(ENV_RPC_MAX_MESSAGE_BYTES)).unwrap_or(
                if sandboxed {
                    SANDBOXED_MAX_MESSAGE_BYTES
                } else {
                    0
                },
            ),
        }
    }

    pub fn allows_message(&self, len: usize) -> bool {
        self.max_message_bytes == 0 || len <= self.max_message_bytes as usize
    }
}

fn parse_bool(v: Option<String>) -> Option<bool> {
    match v?.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

fn parse_u32(v: Option<String>) -> Option<u32> {
    v?.trim().parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn policy_with(vars: &[(&str, &str)]) -> RpcPolicy {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RpcPolicy::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_env() {
        assert_eq!(policy_with(&[]), RpcPolicy::default());
    }

    #[test]
    fn sandboxed_disables_and_caps() {
        let pol = policy_with(&[(ENV_SANDBOXED, "1")]);
        assert!(!pol.enabled);
        assert_eq!(pol.max_message_bytes, SANDBOXED_MAX_MESSAGE_BYTES);

        let pol = policy_with(&[(ENV_SANDBOXED, "yes"), (ENV_RPC, "1")]);
        assert!(pol.enabled);
    }

    #[test]
    fn explicit_limits_and_junk_values() {
        let pol = policy_with(&[
            (ENV_RPC_SEND_CHUNK_BYTES, "512"),
            (ENV_RPC_MAX_MESSAGE_BYTES, "nope"),
            (ENV_RPC, "maybe"),
        ]);
        assert_eq!(pol.send_chunk_bytes, 512);
        assert_eq!(pol.max_message_bytes, 0);
        assert!(pol.enabled);
        assert!(pol.allows_message(usize::MAX));
    }

    #[test]
    fn message_limit_is_inclusive() {
        let pol = RpcPolicy {
            max_message_bytes: 4,
            ..RpcPolicy::default()
        };
        assert!(pol.allows_message(4));
        assert!(!pol.allows_message(5));
    }
}
