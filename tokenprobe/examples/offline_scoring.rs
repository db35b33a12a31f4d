use tokenprobe::analysis::Analysis;
use tokenprobe::render::Renderer;
use tokenprobe::types::logprobs::TokenLogprob;
use tokenprobe::{ConfidencePolicy, LogBase, Scorer};

fn main() {
    let tokens = vec![
        TokenLogprob::new("The", -0.01),
        TokenLogprob::new(" cat", -0.22),
        TokenLogprob::new(" sat", -1.61),
    ];
    for base in [LogBase::Natural, LogBase::Two] {
        let scorer = Scorer::new(base, ConfidencePolicy::four_tier());
        let analysis = Analysis::from_tokens(
            &scorer,
            format!("offline ({base} base)"),
            "none",
            0.0,
            "The cat sat",
            &tokens,
        );
        print!("{}", Renderer::default().render(&analysis));
    }
}
