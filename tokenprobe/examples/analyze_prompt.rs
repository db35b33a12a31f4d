use tokenprobe::completions::CompletionOptions;
use tokenprobe::render::Renderer;
use tokenprobe::{Analyzer, Client, Scorer};

#[tokio::main]
async fn main() -> tokenprobe::Result<()> {
    let client = Client::from_env()?;
    let options = CompletionOptions {
        temperature: 1.1,
        ..Default::default()
    };
    let analyzer = Analyzer::new(client, Scorer::default(), options);
    let analysis = analyzer
        .analyze("In which episode of Friends does Rachel shove a marshmallow up Monica's nose?")
        .await?;
    print!("{}", Renderer::default().render(&analysis));
    Ok(())
}
