//! Connection descriptor construction.
//!
//! The URI below is shown verbatim to users and consumed by their VPN
//! client apps, so its shape is a compatibility surface: every parameter
//! and its order must stay exactly as is. It is a pure function of the
//! issued identifier and the inbound's transport parameters — if the
//! panel rotates its public key or short id, previously issued
//! descriptors go stale, which is an accepted limitation.

/// Builds the vless connection URI for an issued credential.
pub fn build_vless(
    client_id: &str,
    host: &str,
    port: u16,
    plan_tag: &str,
    fake_id: i64,
    public_key: &str,
    short_id: &str,
) -> String {
    format!(
        "vless://{client_id}@{host}:{port}\
         ?type=xhttp\
         &encryption=none\
         &path=%2Fnews\
         &host=quad9.net\
         &mode=auto\
         &security=reality\
         &pbk={public_key}\
         &fp=chrome\
         &sni=google.com\
         &sid={short_id}\
         &spx=%2F\
         #Kynix-VPN-{plan_tag}-{fake_id}"
    )
}

/// Hostname part of the panel base URL, with scheme and port stripped.
/// The panel and the VPN endpoint share a host in this deployment.
pub fn base_host(base_url: &str) -> String {
    let stripped = base_url
        .trim_start_matches("http://")
        .trim_start_matches("https://");
    stripped
        .split(':')
        .next()
        .unwrap_or(stripped)
        .trim_end_matches('/')
        .to_string()
}
