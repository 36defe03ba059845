use async_trait::async_trait;

use crate::domain::entities::{GenerationKind, GenerationParams};
use crate::domain::errors::GeneratorError;
use crate::domain::ports::Generator;

const OPENER_TEMPLATES: &[&str] = &[
    "Okay, I have to ask about {hook}. What's the story there?",
    "You mentioned {hook}, so I'm guessing you have strong opinions. Convince me.",
    "{hook} caught my eye. Recent obsession or lifelong habit?",
    "Quick question about {hook}: best or worst decision you've made this year?",
    "I was going to open with something clever, but {hook} beat me to it. Tell me more?",
];

const STOPWORDS: &[&str] = &[
    "about", "also", "really", "love", "like", "just", "that", "this", "with", "have", "from",
    "your", "when", "what", "will", "into", "very", "some", "they", "them", "been", "more",
];

// Offline generator used when no AI backend is reachable. Output is
// deterministic for a given input.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    pub fn render(&self, params: &GenerationParams) -> Vec<String> {
        let hook = extract_hook(&params.profile_text);
        match params.kind {
            GenerationKind::Opener => openers(&hook, &params.profile_text),
            GenerationKind::BioReview => bio_review(&hook, &params.profile_text),
        }
    }
}

#[async_trait]
impl Generator for TemplateGenerator {
    async fn generate(&self, params: &GenerationParams) -> Result<Vec<String>, GeneratorError> {
        Ok(self.render(params))
    }
}

fn openers(hook: &str, profile_text: &str) -> Vec<String> {
    let seed = profile_text.bytes().fold(0usize, |acc, b| acc.wrapping_add(b as usize));
    (0..3)
        .map(|offset| OPENER_TEMPLATES[(seed + offset) % OPENER_TEMPLATES.len()])
        .map(|template| capitalize(&template.replace("{hook}", hook)))
        .collect()
}

fn bio_review(hook: &str, profile_text: &str) -> Vec<String> {
    let length = profile_text.chars().count();
    let mut review = Vec::new();

    if length < 80 {
        review.push(
            "Your bio is on the short side. Add one concrete detail people can ask about."
                .to_string(),
        );
    } else if length > 500 {
        review.push(
            "Your bio runs long. Keep the two most specific details and cut the rest.".to_string(),
        );
    } else {
        review.push("Good length: easy to read in one glance.".to_string());
    }

    review.push(format!(
        "Lead with {hook}; it is the most specific thing you share."
    ));

    if !profile_text.contains('?') {
        review.push("End with a question so matches have an easy way to start talking.".to_string());
    }

    review
}

// Picks the longest non-filler word as the conversation hook.
fn extract_hook(profile_text: &str) -> String {
    profile_text
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|word| word.chars().count() >= 4)
        .filter(|word| !STOPWORDS.contains(&word.to_lowercase().as_str()))
        .fold(None::<&str>, |best, word| match best {
            Some(current) if current.chars().count() >= word.chars().count() => Some(current),
            _ => Some(word),
        })
        .map(|word| word.to_lowercase())
        .unwrap_or_else(|| "your profile".to_string())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
