//! Thin stand-ins for the HTML surface.
//!
//! The real landing/bridge/demo pages, their i18n-aware template rendering,
//! and the DApp-side provider / Mobile-side bridge scripts they embed are
//! external collaborators (see spec §1). These handlers exist only so the
//! URL surface in §4.4 is fully wired up and the process is runnable
//! end-to-end; they return minimal placeholder markup, not a templating
//! engine.

pub fn landing_for_session(id: &str, secret: Option<&str>) -> String {
    let key_attr = secret.unwrap_or_default();
    format!(
        "<!doctype html><html><head><title>DApp Relay</title></head>\
         <body data-session=\"{id}\" data-key=\"{key_attr}\">\
         <p>Scan confirmed for session {id}. Open this page in your wallet's in-app browser.</p>\
         </body></html>"
    )
}

pub fn landing() -> &'static str {
    "<!doctype html><html><head><title>DApp Relay</title></head><body>\
     <p>Connect a DApp to a mobile wallet.</p></body></html>"
}

pub fn bridge(session: &str) -> String {
    format!(
        "<!doctype html><html><head><title>DApp Relay Bridge</title></head>\
         <body data-session=\"{session}\"><p>Bridging session {session}.</p></body></html>"
    )
}

pub fn demo() -> &'static str {
    "<!doctype html><html><head><title>DApp Relay Demo</title></head><body>\
     <p>Demo DApp using the relay.</p></body></html>"
}

pub fn root() -> &'static str {
    "<!doctype html><html><head><title>DApp Relay</title></head><body>\
     <p>Self-hosted relay for pairing DApps with mobile wallets.</p></body></html>"
}

pub const LOGO_SVG: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 32 32\">\
<circle cx=\"16\" cy=\"16\" r=\"14\" fill=\"currentColor\"/></svg>";
