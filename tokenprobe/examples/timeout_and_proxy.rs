use tokenprobe::completions::CompletionOptions;
use tokenprobe::Client;

#[tokio::main]
async fn main() -> tokenprobe::Result<()> {
    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| "YOUR_API_KEY".to_string());

    let mut builder = Client::builder().api_key(api_key).timeout(30);
    if let Ok(proxy) = std::env::var("TOKENPROBE_PROXY") {
        builder = builder.proxy(proxy);
    }

    let client = builder.build()?;

    let result = client
        .completions()
        .create_with_logprobs("The largest planet is", &CompletionOptions::default())
        .await?;
    for token in &result.tokens {
        println!("{:?} {:.4}", token.token, token.logprob);
    }
    Ok(())
}
