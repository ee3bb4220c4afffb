//! OAuth 1.0a Signing Script
//!
//! Prints the signature base string and `Authorization` header for a request,
//! to help debug signature mismatches.
//!
//! ```bash
//! sign_request POST https://api.twitter.com/1.1/statuses/update.json status=Hello
//! ```
//!
//! Credentials are read from the `xapi_*` environment variables. Set
//! `OAUTH_NONCE` and `OAUTH_TIMESTAMP` to reproduce a known signature.

use std::collections::BTreeMap;
use std::env;

use costello_site::oauth::{
    generate_header_value_with, header_field, normalize_uri, percent_encode,
    signature_base_string,
};
use costello_site::TwitterConfig;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        println!("Usage: sign_request <METHOD> <URL> [name=value ...]");
        return Err("A method and URL are required".into());
    }

    let method = &args[0];
    let url = url::Url::parse(&args[1])?;

    // Query string parameters are signed along with the ones given on the command line
    let mut owned: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    for pair in &args[2..] {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("'{}' is not a name=value pair", pair))?;
        owned.push((name.to_string(), value.to_string()));
    }
    let parameters: Vec<(&str, &str)> = owned
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();

    let config = TwitterConfig::from_env()?;
    let nonce = env::var("OAUTH_NONCE").ok();
    let timestamp = env::var("OAUTH_TIMESTAMP").ok();

    let header = generate_header_value_with(
        method,
        url.as_str(),
        &parameters,
        &config.credentials,
        nonce.as_deref(),
        timestamp.as_deref(),
    )?;

    // Rebuild the base string from the values actually used in the header
    let mut signed: BTreeMap<String, String> = owned.iter().cloned().collect();
    for name in [
        "oauth_consumer_key",
        "oauth_nonce",
        "oauth_signature_method",
        "oauth_timestamp",
        "oauth_token",
        "oauth_version",
    ] {
        let value = header_field(&header, name).unwrap_or_default();
        signed.insert(name.to_string(), urlencoding::decode(value)?.into_owned());
    }
    let parameter_string = signed
        .iter()
        .map(|(name, value)| format!("{}={}", percent_encode(name), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    println!("Signature base string:");
    println!("{}", signature_base_string(method, &normalize_uri(url.as_str())?, &parameter_string));
    println!();
    println!("Authorization: OAuth {}", header);

    Ok(())
}
