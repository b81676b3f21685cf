//! Penn Treebank style word splitting.
//!
//! Text is padded and rewritten with a fixed sequence of regex rules so that
//! quotes, clitics, brackets and most punctuation end up surrounded by
//! spaces, then split on whitespace.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref STARTING_QUOTES: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"([«“‘„]|[`]+)").unwrap(), " $1 "),
        (Regex::new(r#"^""#).unwrap(), "``"),
        (Regex::new(r"(``)").unwrap(), " $1 "),
        (Regex::new(r#"([ (\[{<])("|'{2})"#).unwrap(), "$1 `` "),
    ];
    static ref LONE_APOSTROPHE: Regex = Regex::new(r"(?i)(')(\w)\b").unwrap();

    static ref PUNCTUATION: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r#"([^\.])(\.)([\]\)}>"']*)\s*$"#).unwrap(), "$1 $2 $3 "),
        (Regex::new(r"([:,])([^\d])").unwrap(), " $1 $2"),
        (Regex::new(r"([:,])$").unwrap(), " $1 "),
        (Regex::new(r"\.{2,}").unwrap(), " $0 "),
        (Regex::new(r"[;@#$%&]").unwrap(), " $0 "),
        (Regex::new(r"[?!]").unwrap(), " $0 "),
        (Regex::new(r"([^'])' ").unwrap(), "$1 ' "),
        (Regex::new(r"[*]").unwrap(), " $0 "),
    ];
    static ref PARENS_BRACKETS: Regex = Regex::new(r"[\]\[\(\)\{\}<>]").unwrap();
    static ref DOUBLE_DASHES: Regex = Regex::new(r"--").unwrap();

    static ref ENDING_QUOTES: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"([»”’])").unwrap(), " $1 "),
        (Regex::new(r"''").unwrap(), " '' "),
        (Regex::new(r#"""#).unwrap(), " '' "),
        (Regex::new(r"([^' ])('[sS]|'[mM]|'[dD]|') ").unwrap(), "$1 $2 "),
        (Regex::new(r"([^' ])('ll|'LL|'re|'RE|'ve|'VE|n't|N'T) ").unwrap(), "$1 $2 "),
    ];

    static ref CONTRACTIONS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(can)(not)\b").unwrap(),
        Regex::new(r"(?i)\b(d)('ye)\b").unwrap(),
        Regex::new(r"(?i)\b(gim)(me)\b").unwrap(),
        Regex::new(r"(?i)\b(gon)(na)\b").unwrap(),
        Regex::new(r"(?i)\b(got)(ta)\b").unwrap(),
        Regex::new(r"(?i)\b(lem)(me)\b").unwrap(),
        Regex::new(r"(?i)\b(more)('n)\b").unwrap(),
        Regex::new(r"(?i) ('t)(is)\b").unwrap(),
        Regex::new(r"(?i) ('t)(was)\b").unwrap(),
    ];
    static ref WANNA: Regex = Regex::new(r"(?i)\b(wan)(na)(\s)").unwrap();
}

fn apply_all(text: String, rules: &[(Regex, &str)]) -> String {
    rules
        .iter()
        .fold(text, |acc, (re, rep)| re.replace_all(&acc, *rep).into_owned())
}

/// Splits text into word tokens.
pub fn word_tokenize(text: &str) -> Vec<String> {
    let mut text = apply_all(text.to_string(), &STARTING_QUOTES);

    // An apostrophe opening a one letter word is a quote, not a clitic
    text = LONE_APOSTROPHE
        .replace_all(&text, |caps: &Captures| {
            let letter = &caps[2];
            match letter.to_ascii_lowercase().as_str() {
                "m" | "t" | "s" | "d" | "n" => caps[0].to_string(),
                _ => format!("{} {}", &caps[1], letter),
            }
        })
        .into_owned();

    text = apply_all(text, &PUNCTUATION);
    text = PARENS_BRACKETS.replace_all(&text, " $0 ").into_owned();
    text = DOUBLE_DASHES.replace_all(&text, " -- ").into_owned();

    text = format!(" {} ", text);
    text = apply_all(text, &ENDING_QUOTES);

    for re in CONTRACTIONS.iter() {
        text = re.replace_all(&text, " $1 $2 ").into_owned();
    }
    text = WANNA.replace_all(&text, " $1 $2 $3").into_owned();

    text.split_whitespace().map(str::to_string).collect()
}
