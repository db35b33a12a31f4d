use tokenprobe::completions::CompletionOptions;
use tokenprobe::Client;

#[tokio::main]
async fn main() -> tokenprobe::Result<()> {
    let client = Client::from_env()?;
    let options = CompletionOptions {
        model: "invalid-model".into(),
        ..Default::default()
    };
    let result = client
        .completions()
        .create_with_logprobs("hello", &options)
        .await;

    match result {
        Ok(result) => println!("unexpected success: {:?}", result.completion),
        Err(err) => eprintln!("request failed: {err}"),
    }

    Ok(())
}
