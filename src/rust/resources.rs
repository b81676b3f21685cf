/// Base URL of the NLTK data package index.
pub const NLTK_DATA_URL: &str = "https://raw.githubusercontent.com/nltk/nltk_data/gh-pages/packages";

/// Language resources the tokenizer depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageResource {
    /// WordNet noun index and exception list, used by the lemmatizer
    WordNet,
    /// English stopword list
    Stopwords,
}

/// Where a resource comes from and which files are kept from it
#[derive(Debug, Clone)]
pub struct ResourceInfo {
    /// Directory name under the resource cache
    pub name: String,
    /// Location of the zip package
    pub url: String,
    /// Archive members extracted next to each other in the resource directory
    pub members: Vec<String>,
    /// Pinned SHA-256 of the package, if known
    pub archive_hash: Option<String>,
}

impl LanguageResource {
    /// All resources required before training can start
    pub const REQUIRED: [LanguageResource; 2] = [LanguageResource::WordNet, LanguageResource::Stopwords];

    pub fn get_resource_info(&self) -> ResourceInfo {
        match self {
            Self::WordNet => ResourceInfo {
                name: "wordnet".to_string(),
                url: format!("{}/corpora/wordnet.zip", NLTK_DATA_URL),
                members: vec!["wordnet/index.noun".to_string(), "wordnet/noun.exc".to_string()],
                archive_hash: None,
            },
            Self::Stopwords => ResourceInfo {
                name: "stopwords".to_string(),
                url: format!("{}/corpora/stopwords.zip", NLTK_DATA_URL),
                members: vec!["stopwords/english".to_string()],
                archive_hash: None,
            },
        }
    }

    /// File names (without the archive directory) stored for this resource
    pub fn file_names(&self) -> Vec<String> {
        self.get_resource_info()
            .members
            .iter()
            .map(|m| m.rsplit('/').next().unwrap_or(m).to_string())
            .collect()
    }
}
