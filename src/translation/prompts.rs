/*!
 * Prompt assembly for translation and research calls.
 *
 * All builders are pure string functions. The system prompt template
 * carries `{{...}}` slots that are filled conditionally; any slot left
 * unfilled is stripped before the prompt is sent.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::glossary::GlossaryItem;

/// Default system prompt template.
///
/// The formatting rules are load-bearing: the model must echo the `%%`
/// separator so the response can be split back into exactly one segment per
/// input line, and single-line inputs must come back bare, with no
/// commentary.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a {{to}} subtitle translator, an expert in localization and subtitling.
Your task is to translate the content inside <source_text> tags into natural, concise, accurate {{to}}.

## 1. Core Responsibilities
- **Meaning**: Translate the underlying meaning, not word by word. Capture the speaker's tone.
- **Conciseness**: Subtitles have strict space limits. Keep translations brief and easy to read.
- **Naturalness**: Use authentic spoken language rather than stiff, literal phrasing.

## 2. Strict Formatting Rules
- **Segment Count**: The output must contain EXACTLY the same number of segments as the input. One segment in = one segment out.
- **Separators**: Use '%%' between segments exactly as it appears in the input.
- **No Extra Text**: Output ONLY the translation. No "Here is the translation", no notes, no explanations, no XML tags. A single-segment input gets a single bare translated segment.

## 3. Handling Special Content
- **Tags/Code**: Do NOT translate HTML tags (e.g. <i>, <b>), timecodes, or special codes. Keep them exactly as they are.
- **Proper Nouns**: Keep names and places consistent throughout.
{{rich_text_rule}}
{{glossary_section}}
{{additional_rules}}

## 4. Input Structure
- **Single segment**: <source_text>Content</source_text>
- **Multiple segments**: <source_text>Segment 1%%Segment 2</source_text>

## Research Notes (Plot/Mood Analysis)
{{tactic_context}}

## Examples
### Multi-segment input:
<source_text>
Hi there.
%%
Long time no see.
</source_text>

### Multi-segment output:
Bonjour.
%%
Ça fait longtemps.

{{context_section}}"#;

/// Default user prompt template wrapping the text to translate.
pub const DEFAULT_USER_PROMPT: &str = "<source_text>\n{{text}}\n</source_text>";

/// System prompt used for the research pre-pass.
pub const RESEARCH_SYSTEM_PROMPT: &str =
    "You are a professional context analyzer for subtitle translation.";

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{.*?\}\}").unwrap());

/// Inputs for [`build_system_prompt`].
#[derive(Debug, Default)]
pub struct PromptOptions<'a> {
    /// Target language label injected into the template
    pub target_lang: &'a str,
    /// Source language label, substituted when a custom template asks for it
    pub source_lang: Option<&'a str>,
    /// Research analysis text from the pre-pass, if any
    pub tactic_context: Option<&'a str>,
    /// Whether to inject the markup-preservation rule
    pub rich_text: bool,
    /// Extra numbered rules appended to the special-content section
    pub additional_rules: &'a [String],
    /// Tail of the preceding batch (translated when available)
    pub previous_context: &'a str,
    /// Head of the following batch (always original text)
    pub future_context: &'a str,
    /// Glossary items matched against this batch's text
    pub glossary: &'a [GlossaryItem],
}

impl<'a> PromptOptions<'a> {
    /// Create options for a target language with rich text enabled.
    pub fn new(target_lang: &'a str) -> Self {
        Self {
            target_lang,
            rich_text: true,
            ..Self::default()
        }
    }
}

/// Assemble the system prompt from a template and the given options.
///
/// Sections are injected only when their inputs are non-empty; leftover
/// placeholders are stripped.
pub fn build_system_prompt(template: Option<&str>, options: &PromptOptions<'_>) -> String {
    let mut prompt = template
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
        .replace("{{to}}", options.target_lang);
    if let Some(source_lang) = options.source_lang {
        prompt = prompt.replace("{{from}}", source_lang);
    }

    let rich_text_rule = if options.rich_text {
        "- **Markup**: If the text contains HTML tags, place the tags where they belong in the translation while keeping it fluent."
    } else {
        ""
    };
    prompt = prompt.replace("{{rich_text_rule}}", rich_text_rule);

    let glossary_section = if options.glossary.is_empty() {
        String::new()
    } else {
        let mut section = String::from("\n### Glossary / Key Terms\n");
        for item in options.glossary {
            section.push_str(&format!("- **{}**: {}", item.term, item.translation));
            if let Some(context) = &item.context {
                section.push_str(&format!(" ({})", context));
            }
            section.push('\n');
        }
        section
    };
    prompt = prompt.replace("{{glossary_section}}", glossary_section.trim_end());

    let additional_rules = if options.additional_rules.is_empty() {
        String::new()
    } else {
        let mut section = String::from("\n");
        for (i, rule) in options.additional_rules.iter().enumerate() {
            section.push_str(&format!("{}. {}\n", 4 + i, rule));
        }
        section
    };
    prompt = prompt.replace("{{additional_rules}}", additional_rules.trim_end());

    prompt = prompt.replace("{{tactic_context}}", options.tactic_context.unwrap_or(""));

    let mut context_section = String::new();
    if !options.previous_context.is_empty() {
        context_section.push_str(&format!("\n\nPREVIOUS CONTEXT:\n{}", options.previous_context));
    }
    if !options.future_context.is_empty() {
        context_section.push_str(&format!("\n\nFUTURE CONTEXT:\n{}", options.future_context));
    }
    prompt = prompt.replace("{{context_section}}", context_section.trim_start_matches('\n'));

    PLACEHOLDER_RE.replace_all(&prompt, "").into_owned()
}

/// Substitute the user prompt template for a batch's merged text.
pub fn build_user_prompt(text: &str, template: Option<&str>, source: &str, target: &str) -> String {
    template
        .unwrap_or(DEFAULT_USER_PROMPT)
        .replace("{{to}}", target)
        .replace("{{from}}", source)
        .replace("{{text}}", text)
}

/// Analysis prompt for the research pre-pass.
pub fn build_research_prompt(merged_text: &str, source: &str, target: &str) -> String {
    format!(
        "Analyze the following text for translation context (Source: {}, Target: {}).\n\
         Identify:\n\
         1. Speaker tone/mood (formal, casual, tense, etc.)\n\
         2. Key terms or proper nouns that need specific handling\n\
         3. Plot context based on the lines\n\
         \n\
         Text to analyze:\n\
         {}\n\
         \n\
         Output concise analysis in bullet points.",
        source, target, merged_text
    )
}
