// generate_key.rs
// Utility to generate a new APP_SECRET for token encryption

#[allow(dead_code)]
#[path = "services/encryption.rs"]
mod encryption;

use encryption::TokenCipher;

fn main() {
    println!("Generating new application secret...\n");

    let secret = TokenCipher::generate_secret();

    println!("✅ Secret generated successfully!\n");
    println!("Add this to your .env file:");
    println!("─────────────────────────────────────────────────");
    println!("APP_SECRET_CURR={}", secret);
    println!("─────────────────────────────────────────────────");
    println!("\n⚠️  IMPORTANT:");
    println!("  • Keep this secret out of version control");
    println!("  • When rotating, move the old value to APP_SECRET_PREV");
    println!("  • Stored tokens become unreadable once both secrets are gone");
}
