//! Fixed user-facing strings and prompt directives, one table per language.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Hebrew,
    English,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "he" | "he-il" | "hebrew" => Ok(Locale::Hebrew),
            "en" | "en-us" | "english" => Ok(Locale::English),
            other => Err(format!("Unknown locale: {other}")),
        }
    }
}

impl Locale {
    pub fn phrases(self) -> &'static Phrases {
        match self {
            Locale::Hebrew => &HEBREW,
            Locale::English => &ENGLISH,
        }
    }
}

#[derive(Debug)]
pub struct Phrases {
    /// `{title}` is replaced with the webinar title.
    pub greeting: &'static str,
    pub missing_credential: &'static str,
    pub empty_reply: &'static str,
    pub service_error: &'static str,
    pub assistant_identity: &'static str,
    pub context_heading: &'static str,
    pub directives_heading: &'static str,
    /// Target language, concision, honesty about uncertainty, tone.
    pub directives: [&'static str; 4],
    pub summary_missing_credential: &'static str,
    pub summary_empty: &'static str,
    pub summary_error: &'static str,
    /// `{topics}` and `{description}` are substituted.
    pub summary_prompt: &'static str,
}

impl Phrases {
    pub fn greeting_for(&self, title: &str) -> String {
        self.greeting.replace("{title}", title)
    }

    pub fn summary_prompt_for(&self, description: &str, topics: &str) -> String {
        self.summary_prompt
            .replace("{topics}", topics)
            .replace("{description}", description)
    }
}

static HEBREW: Phrases = Phrases {
    greeting: "שלום! אני העוזר החכם שלך לוובינר \"{title}\". שאל אותי כל דבר שקשור לנושא!",
    missing_credential: "חסר מפתח API. אנא וודא שהגדרת את GEMINI_API_KEY",
    empty_reply: "מצטער, לא הצלחתי לייצר תשובה כרגע.",
    service_error: "אירעה שגיאה בתקשורת עם השרת. אנא נסה שנית מאוחר יותר.",
    assistant_identity: "אתה עוזר וירטואלי חכם לפלטפורמת וובינרים בשם \"תקשור\".\n\
                         המטרה שלך היא לעזור למשתמשים להבין את התוכן של הוובינר, לענות על שאלות ולסכם נושאים.",
    context_heading: "הקשר הנוכחי של הוובינר:",
    directives_heading: "הנחיות:",
    directives: [
        "ענה תמיד בעברית רהוטה ומקצועית.",
        "היה קצר ולעניין אלא אם כן נשאלת שאלה מורכבת.",
        "אם אינך יודע את התשובה על סמך ההקשר, אמור זאת בנימוס והצע מידע כללי.",
        "שמור על טון מכבד, רגוע ותומך.",
    ],
    summary_missing_credential: "חסר מפתח API.",
    summary_empty: "לא ניתן היה לייצר סיכום.",
    summary_error: "שגיאה ביצירת סיכום.",
    summary_prompt: "צור סיכום קצר, מובנה ומזמין עבור וובינר בנושאים הבאים: {topics}.\n\
                     תיאור הוובינר: {description}.\n\
                     הסיכום צריך להיות בעברית, מחולק לנקודות עיקריות (בולטים).",
};

static ENGLISH: Phrases = Phrases {
    greeting: "Hi! I'm your assistant for the webinar \"{title}\". Ask me anything about it!",
    missing_credential: "The API key is missing. Make sure GEMINI_API_KEY is set.",
    empty_reply: "Sorry, I couldn't produce an answer right now.",
    service_error: "Something went wrong talking to the server. Please try again later.",
    assistant_identity: "You are a smart virtual assistant for a webinar platform.\n\
                         Your goal is to help users understand the webinar content, answer questions and summarize topics.",
    context_heading: "Current webinar context:",
    directives_heading: "Guidelines:",
    directives: [
        "Always answer in clear, professional English.",
        "Keep answers short and to the point unless the question is complex.",
        "If you don't know the answer from the context, say so politely and offer general information.",
        "Keep a respectful, calm and supportive tone.",
    ],
    summary_missing_credential: "The API key is missing.",
    summary_empty: "Could not generate a summary.",
    summary_error: "Error while generating the summary.",
    summary_prompt: "Write a short, structured and inviting summary for a webinar on these topics: {topics}.\n\
                     Webinar description: {description}.\n\
                     The summary should be in English, split into key bullet points.",
};
