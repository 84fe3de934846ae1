use serde::{Deserialize, Serialize};

const CJK_FINAL_PROMPT: &str = "In Chinese, write a case brief for the following judgment, includes the facts, procedural history, holdings, rationales for each holding, and final disposition: \n\n";
const CJK_MERGE_PROMPT: &str = "In Chinese, condense the following part of a judgment, keeping the facts, procedural history, holdings, rationales for each holding, and final disposition it mentions: \n\n";
const LATIN_FINAL_PROMPT: &str = "Write a case brief for the following judgment, includes the facts, procedural history, holdings, rationales for each holding, and final disposition: \n\n";
const LATIN_MERGE_PROMPT: &str = "Condense the following part of a judgment, keeping the facts, procedural history, holdings, rationales for each holding, and final disposition it mentions: \n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Cjk,
    Latin,
}

impl Language {
    pub fn label(self) -> &'static str {
        match self {
            Language::Cjk => "cjk",
            Language::Latin => "latin",
        }
    }
}

fn is_cjk_ideograph(ch: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&ch)
}

/// Pick the template language from a character-frequency count. Ties go to
/// CJK, so text with neither script is treated as CJK.
pub fn classify(text: &str) -> Language {
    let (cjk, latin) = text.chars().fold((0usize, 0usize), |(cjk, latin), ch| {
        if is_cjk_ideograph(ch) {
            (cjk + 1, latin)
        } else if ch.is_ascii_alphabetic() {
            (cjk, latin + 1)
        } else {
            (cjk, latin)
        }
    });
    if cjk >= latin {
        Language::Cjk
    } else {
        Language::Latin
    }
}

/// The prompt pair used for one pass: `merge` prefixes every window of the
/// chunked case, `final_prompt` prefixes the single-call base case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    pub merge: String,
    pub final_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSet {
    pub cjk_merge: String,
    pub cjk_final: String,
    pub latin_merge: String,
    pub latin_final: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            cjk_merge: CJK_MERGE_PROMPT.to_string(),
            cjk_final: CJK_FINAL_PROMPT.to_string(),
            latin_merge: LATIN_MERGE_PROMPT.to_string(),
            latin_final: LATIN_FINAL_PROMPT.to_string(),
        }
    }
}

impl PromptSet {
    pub fn for_language(&self, language: Language) -> PromptTemplates {
        match language {
            Language::Cjk => PromptTemplates {
                merge: self.cjk_merge.clone(),
                final_prompt: self.cjk_final.clone(),
            },
            Language::Latin => PromptTemplates {
                merge: self.latin_merge.clone(),
                final_prompt: self.latin_final.clone(),
            },
        }
    }
}
