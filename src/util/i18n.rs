use fluent::{FluentBundle, FluentResource};
use fluent_bundle::{FluentArgs, FluentValue};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use unic_langid::LanguageIdentifier;

const FALLBACK_LOCALE: &str = "en-US";
const BUNDLED_EN_US: &str = include_str!("../../locales/en-US/main.ftl");

type Bundle = FluentBundle<Arc<FluentResource>>;

/// Manages localization resources and provides translation API
pub struct LocalizationManager {
    bundle: Bundle,
    fallback_bundle: Option<Bundle>,
    current_locale: String,
}

impl LocalizationManager {
    /// Create a manager for `locale` ("en", "ja" or a full identifier)
    ///
    /// Locale files are read from the `locales/<id>` resource directory. When
    /// they cannot be loaded the built-in English strings are used instead.
    pub fn new(locale: &str) -> anyhow::Result<Self> {
        let locale_id = match locale.to_lowercase().as_str() {
            "en" => "en-US".to_string(),
            "ja" => "ja-JP".to_string(),
            _ => locale.to_string(),
        };

        tracing::info!("Loading translations for locale: {}", locale_id);

        let bundle = match Self::load_locale_bundle(&locale_id) {
            Ok(bundle) => bundle,
            Err(e) => {
                tracing::warn!(
                    "Failed to load locale {}: {}; using built-in strings",
                    locale_id,
                    e
                );
                return Ok(Self::bundled());
            }
        };

        let fallback_bundle = if locale_id != FALLBACK_LOCALE {
            match Self::bundled_bundle() {
                Ok(fallback) => Some(fallback),
                Err(e) => {
                    tracing::warn!("Failed to load built-in fallback locale: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            bundle,
            fallback_bundle,
            current_locale: locale.to_string(),
        })
    }

    /// Manager backed only by the English strings compiled into the binary
    pub fn bundled() -> Self {
        let bundle = match Self::bundled_bundle() {
            Ok(bundle) => bundle,
            Err(e) => {
                tracing::error!("Built-in translations are invalid: {}", e);
                Self::empty_bundle()
            }
        };
        Self {
            bundle,
            fallback_bundle: None,
            current_locale: FALLBACK_LOCALE.to_string(),
        }
    }

    fn empty_bundle() -> Bundle {
        let lang_id: LanguageIdentifier = FALLBACK_LOCALE.parse().unwrap_or_default();
        let mut bundle = FluentBundle::new(vec![lang_id]);
        bundle.set_use_isolating(false);
        bundle
    }

    fn bundled_bundle() -> anyhow::Result<Bundle> {
        let resource = FluentResource::try_new(BUNDLED_EN_US.to_string())
            .map_err(|(_, errors)| {
                anyhow::anyhow!("Failed to parse built-in strings: {:?}", errors)
            })?;
        let mut bundle = Self::empty_bundle();
        bundle
            .add_resource(Arc::new(resource))
            .map_err(|errors| anyhow::anyhow!("Failed to add built-in strings: {:?}", errors))?;
        Ok(bundle)
    }

    fn load_locale_bundle(locale_id: &str) -> anyhow::Result<Bundle> {
        let locale_dir = Self::get_locale_dir(locale_id)?;

        let lang_id: LanguageIdentifier = locale_id
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid locale ID '{}': {:?}", locale_id, e))?;

        let mut bundle = FluentBundle::new(vec![lang_id]);
        // Rendered text goes straight into list rows
        bundle.set_use_isolating(false);

        let resources = Self::load_ftl_files(&locale_dir)?;
        if resources.is_empty() {
            anyhow::bail!("No .ftl files found in {}", locale_dir.display());
        }

        for resource in resources {
            if let Err(errors) = bundle.add_resource(resource) {
                for error in errors {
                    tracing::error!("Failed to add resource to bundle: {:?}", error);
                }
            }
        }

        tracing::debug!("Loaded locale bundle for {}", locale_id);
        Ok(bundle)
    }

    fn get_locale_dir(locale_id: &str) -> anyhow::Result<PathBuf> {
        let locales_dir = super::paths::find_resource_directory("locales")?;
        let locale_path = locales_dir.join(locale_id);
        if locale_path.is_dir() {
            Ok(locale_path)
        } else {
            anyhow::bail!("Locale directory not found for '{}'", locale_id)
        }
    }

    fn load_ftl_files(dir: &Path) -> anyhow::Result<Vec<Arc<FluentResource>>> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("ftl"))
            .collect();
        entries.sort();

        let mut resources = Vec::new();
        for path in entries {
            match Self::load_ftl_file(&path) {
                Ok(resource) => resources.push(resource),
                Err(e) => {
                    tracing::error!("Failed to load translation file {}: {}", path.display(), e);
                }
            }
        }
        Ok(resources)
    }

    fn load_ftl_file(path: &Path) -> anyhow::Result<Arc<FluentResource>> {
        let content = std::fs::read_to_string(path)?;
        let resource = FluentResource::try_new(content).map_err(|(_, errors)| {
            anyhow::anyhow!("Failed to parse {}: {:?}", path.display(), errors)
        })?;
        Ok(Arc::new(resource))
    }

    /// Translated string for `key`, or `[missing: key]`
    pub fn get(&self, key: &str) -> String {
        self.get_with_args(key, None)
    }

    pub fn get_with_args(&self, key: &str, args: Option<&FluentArgs>) -> String {
        if let Some(value) = Self::format(&self.bundle, key, args) {
            return value;
        }
        if let Some(value) = self
            .fallback_bundle
            .as_ref()
            .and_then(|fallback| Self::format(fallback, key, args))
        {
            tracing::debug!("Using fallback translation for key: {}", key);
            return value;
        }
        tracing::warn!("Missing translation key: {}", key);
        format!("[missing: {}]", key)
    }

    /// Convenience for the common single-argument case
    pub fn get_with_arg<'a>(
        &self,
        key: &str,
        name: &'a str,
        value: impl Into<FluentValue<'a>>,
    ) -> String {
        let mut args = FluentArgs::new();
        args.set(name, value);
        self.get_with_args(key, Some(&args))
    }

    fn format(bundle: &Bundle, key: &str, args: Option<&FluentArgs>) -> Option<String> {
        let pattern = bundle.get_message(key)?.value()?;
        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            tracing::warn!("Translation errors for key '{}': {:?}", key, errors);
        }
        Some(value.to_string())
    }

    pub fn current_locale(&self) -> &str {
        &self.current_locale
    }
}
