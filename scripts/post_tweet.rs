//! Twitter Tweet Posting Script
//!
//! This script posts a status to Twitter/X using the same client as the web
//! service. Credentials are read from the `xapi_*` environment variables; the
//! text and an optional image URL are entered interactively.

use std::io::{self, Write};

use costello_site::{TwitterClient, TwitterConfig};
use tokio_util::sync::CancellationToken;

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    println!("🐦 Twitter Tweet Posting Tool");
    println!("==============================");

    let config = match TwitterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("❌ {}", e);
            println!("Set xapi_consumer_key, xapi_consumer_secret, xapi_access_token and xapi_access_token_secret");
            return Err(e.into());
        }
    };
    let client = TwitterClient::from_config(&config)?;

    let tweet_text = prompt("📝 Enter your tweet message: ")?;
    if tweet_text.is_empty() {
        println!("❌ Tweet message cannot be empty!");
        return Err("Tweet message is required".into());
    }

    let image_uri = prompt("🖼️  Enter an image URL (leave blank for none): ")?;

    println!("📏 Tweet length: {} characters", tweet_text.chars().count());

    // Cancel any in-flight request on Ctrl+C
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    println!("\n🚀 Posting your tweet...");
    let result = if image_uri.is_empty() {
        client.post(&tweet_text, &cancel).await
    } else {
        client.post_with_image(&tweet_text, &image_uri, &cancel).await
    };

    match result {
        Ok(id) => {
            println!("\n🎉 Success! Your tweet has been posted.");
            println!("🆔 Tweet id: {}", id);
            Ok(())
        }
        Err(e) => {
            println!("\n💥 Failed to post tweet: {}", e);
            Err(e.into())
        }
    }
}
