//! Signed Request Demo
//!
//! Walks through signing a launch payload the way the host platform does,
//! handing it over as a query string and validating it on the receiving side.
//! Run with:
//!
//! ```bash
//! cargo run --example signed_request_demo
//! ```

use signed_request::{SignedRequest, SystemClock, Timestamp};

fn main() {
    println!("🔐 Signed Request Demo");
    println!("======================\n");

    // Demo configuration
    let app_id = "16763705810009f4";
    let secret = "my-shared-secret";
    let issued_at = Timestamp::now(&SystemClock).to_iso8601();

    println!("Configuration:");
    println!("  App ID:    {app_id}");
    println!("  Secret:    {secret}");
    println!("  Issued at: {issued_at}");

    let signer = SignedRequest::new(app_id, secret);
    let params = [
        ("appData", "{\"theme\":\"dark\"}"),
        ("issuedAt", issued_at.as_str()),
        ("locale", "en-US"),
        ("networkEID", "15321edfd8000c68"),
        ("userEID", "166ab7efb600018c"),
        ("role", "member"),
    ];

    let query = signer.sign_to_query_string(params);
    println!("\n✅ Signed query string:");
    println!("  {query}");

    match signer.validate_query_string(&query) {
        Ok(payload) => {
            println!("\n🔍 Validated payload:");
            println!("  networkEID: {}", payload.network_eid);
            println!("  userEID:    {}", payload.user_eid);
            println!("  signature:  {}", payload.signature);
        }
        Err(e) => println!("\n❌ Validation failed: {e}"),
    }

    let tampered = query.replace("role=member", "role=administrator");
    match signer.validate_query_string(&tampered) {
        Ok(_) => println!("\n❌ Tampered request was accepted"),
        Err(e) => println!("\n🛡️  Tampered request rejected: {e}"),
    }

    println!("\n⚙️  The CLI reads its configuration from the environment:");
    println!("  export SIGNED_REQUEST_APP_ID={app_id}");
    println!("  export SIGNED_REQUEST_APP_SECRET={secret}");
    println!("  export SIGNED_REQUEST_WINDOW=60  # seconds");
}
