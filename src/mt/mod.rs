/// Machine Translation Module
///
/// Provider abstraction for the translation step. The traversal and rich-text
/// code only ever sees `&dyn MachineTranslator`; concrete backends live here.
///
/// # Example
///
/// ```ignore
/// use contentful_translate::mt::{DeepLProvider, MachineTranslator, translate_text};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let provider = DeepLProvider::from_env()?;
///     let translated = translate_text(&provider, "Hello", "en", "de").await;
///     println!("{:?}", translated);
///     Ok(())
/// }
/// ```
pub mod deepl;
pub mod error;
pub mod mock;
pub mod translator;

pub use deepl::DeepLProvider;
pub use error::{MtError, MtResult};
pub use mock::{MockMode, MockTranslator};
pub use translator::{MachineTranslator, translate_text, truncate};
