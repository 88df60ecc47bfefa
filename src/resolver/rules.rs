//! Local rule-based replies.
//!
//! One ordered table of triggers over the lowercased utterance. The first
//! entry that matches wins, so the order below is part of the behaviour.

use chrono::Local;

use super::info::InfoCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Greeting,
    WellBeing,
    Thanks,
    Info(InfoCategory),
    Time,
    Capability,
    FileQuery,
    Identity,
    Default,
}

/// What a matched rule asks the resolver to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Reply(String),
    Route(InfoCategory),
}

enum Trigger {
    /// Any whole word matches.
    Word(&'static [&'static str]),
    /// Any substring matches.
    Any(&'static [&'static str]),
    /// Every substring must be present.
    All(&'static [&'static str]),
}

impl Trigger {
    fn matches(&self, input: &str) -> bool {
        match self {
            Trigger::Word(words) => input
                .split(|c: char| !c.is_alphanumeric())
                .any(|w| words.iter().any(|k| *k == w)),
            Trigger::Any(needles) => needles.iter().any(|n| input.contains(n)),
            Trigger::All(needles) => needles.iter().all(|n| input.contains(n)),
        }
    }
}

const TABLE: &[(Trigger, Rule)] = &[
    (Trigger::Word(&["hello", "hi", "hey"]), Rule::Greeting),
    (Trigger::Any(&["how are you"]), Rule::WellBeing),
    (Trigger::Any(&["thank"]), Rule::Thanks),
    (Trigger::Any(&["weather"]), Rule::Info(InfoCategory::Weather)),
    (Trigger::Any(&["news"]), Rule::Info(InfoCategory::News)),
    (
        Trigger::Any(&["employment", "job"]),
        Rule::Info(InfoCategory::Employment),
    ),
    (Trigger::Any(&["market", "stock"]), Rule::Info(InfoCategory::Market)),
    (
        Trigger::All(&["brenin", "project"]),
        Rule::Info(InfoCategory::Projects),
    ),
    (Trigger::Any(&["time"]), Rule::Time),
    (Trigger::Any(&["what can you do", "help"]), Rule::Capability),
    (Trigger::Any(&["file", "upload"]), Rule::FileQuery),
    (Trigger::Any(&["brenin", "who are you"]), Rule::Identity),
];

/// Finds the first rule whose trigger matches the utterance.
pub fn classify(utterance: &str) -> Rule {
    let input = utterance.to_lowercase();
    TABLE
        .iter()
        .find(|(trigger, _)| trigger.matches(&input))
        .map(|(_, rule)| *rule)
        .unwrap_or(Rule::Default)
}

pub fn action_for(rule: Rule) -> Action {
    let text = match rule {
        Rule::Info(category) => return Action::Route(category),
        Rule::Greeting => "Hello there! How can I assist you today?".to_string(),
        Rule::WellBeing => "I'm functioning well, thank you for asking! How about you?".to_string(),
        Rule::Thanks => "You're welcome! Is there anything else I can help you with?".to_string(),
        Rule::Time => format!("The current time is {}.", Local::now().format("%-I:%M:%S %p")),
        Rule::Capability => "I can help you with general questions, provide information about time and weather, assist with file-related queries, and have conversations. Feel free to upload files using the + button and ask me about them!".to_string(),
        Rule::FileQuery => "You can upload files by clicking the + button next to the input field. I can help you with information about different file types and general file management questions.".to_string(),
        Rule::Identity => "I'm Brenin AI, your digital human assistant. I'm here to help you with various tasks and answer your questions. What would you like to know?".to_string(),
        Rule::Default => "That's interesting. Tell me more about that or ask me something else.".to_string(),
    };
    Action::Reply(text)
}
