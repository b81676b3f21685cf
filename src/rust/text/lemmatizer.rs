use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TrainError;

/// Suffix rewrites WordNet applies when looking for the base form of a noun
const NOUN_SUBSTITUTIONS: [(&str, &str); 9] = [
    ("s", ""),
    ("ses", "s"),
    ("ves", "f"),
    ("xes", "x"),
    ("zes", "z"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("men", "man"),
    ("ies", "y"),
];

/// Noun lemmatizer backed by the WordNet noun index.
///
/// A word is reduced to the shortest known noun lemma reachable through the
/// exception list or the suffix rules. Words without such a lemma are
/// returned unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordNetLemmatizer {
    lemmas: HashSet<String>,
    exceptions: HashMap<String, Vec<String>>,
}

impl WordNetLemmatizer {
    pub fn new(
        lemmas: impl IntoIterator<Item = impl Into<String>>,
        exceptions: impl IntoIterator<Item = (String, Vec<String>)>,
    ) -> Self {
        Self {
            lemmas: lemmas.into_iter().map(Into::into).collect(),
            exceptions: exceptions.into_iter().collect(),
        }
    }

    /// Reads `index.noun` and `noun.exc` from a WordNet dictionary directory
    pub fn from_dir(dir: &Path) -> Result<Self, TrainError> {
        let index = read_resource(&dir.join("index.noun"))?;
        let exc = read_resource(&dir.join("noun.exc"))?;
        let lemmatizer = Self::parse(&index, &exc);
        log::debug!(
            "Loaded {} noun lemmas and {} exceptions",
            lemmatizer.lemmas.len(),
            lemmatizer.exceptions.len()
        );
        Ok(lemmatizer)
    }

    /// Builds a lemmatizer from the text of an index file and an exception file
    pub fn parse(index: &str, exceptions: &str) -> Self {
        // License header lines start with a space
        let lemmas = index
            .lines()
            .filter(|line| !line.starts_with(' '))
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_string);

        let exceptions = exceptions.lines().filter_map(|line| {
            let mut fields = line.split_whitespace();
            let inflected = fields.next()?;
            let bases: Vec<String> = fields.map(str::to_string).collect();
            Some((inflected.to_string(), bases))
        });

        Self::new(lemmas, exceptions)
    }

    pub fn len(&self) -> usize {
        self.lemmas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lemmas.is_empty()
    }

    pub fn lemmatize(&self, word: &str) -> String {
        self.morphy(word)
            .into_iter()
            .min_by_key(|lemma| lemma.chars().count())
            .unwrap_or_else(|| word.to_string())
    }

    fn morphy(&self, form: &str) -> Vec<String> {
        if let Some(bases) = self.exceptions.get(form) {
            let candidates = std::iter::once(form.to_string()).chain(bases.iter().cloned());
            return self.known(candidates);
        }

        let mut forms = apply_rules(&[form.to_string()]);
        let first = std::iter::once(form.to_string()).chain(forms.iter().cloned());
        let results = self.known(first);
        if !results.is_empty() {
            return results;
        }

        while !forms.is_empty() {
            forms = apply_rules(&forms);
            let results = self.known(forms.iter().cloned());
            if !results.is_empty() {
                return results;
            }
        }
        Vec::new()
    }

    /// Keeps the candidates that are noun lemmas, first occurrence only
    fn known(&self, candidates: impl Iterator<Item = String>) -> Vec<String> {
        let mut seen = HashSet::new();
        candidates
            .filter(|c| self.lemmas.contains(c))
            .filter(|c| seen.insert(c.clone()))
            .collect()
    }
}

fn apply_rules(forms: &[String]) -> Vec<String> {
    forms
        .iter()
        .flat_map(|form| {
            NOUN_SUBSTITUTIONS.iter().filter_map(move |(old, new)| {
                form.strip_suffix(old).map(|stem| format!("{}{}", stem, new))
            })
        })
        .collect()
}

fn read_resource(path: &Path) -> Result<String, TrainError> {
    fs::read_to_string(path)
        .map_err(|e| TrainError::Lexicon(format!("cannot read {}: {}", path.display(), e)))
}
