mod lemmatizer;
mod stopwords;
mod tokenizer;
pub mod word_tokenize;

pub use lemmatizer::WordNetLemmatizer;
pub use stopwords::StopwordList;
pub use tokenizer::{Lexicon, Tokenizer};
pub use word_tokenize::word_tokenize;
