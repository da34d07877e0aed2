//! Preview binary - prints an article's flat and nested representations
//!
//! Usage:
//!   cargo run -- 1                       # Show article 1 in the default language
//!   cargo run -- 1 --language ja         # Show article 1 with Japanese enforced
//!   cargo run -- --seed                  # Store a sample article and show it
//!
//! Optional environment variables:
//! - DATABASE_PATH (defaults to translations.db)
//! - DEFAULT_LANGUAGE (defaults to en)
//! - LANGUAGES (defaults to en,ja,fr,es)
//! - LANGUAGE_QUERY_KEY (defaults to language)

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::collections::HashMap;
use tracing::info;
use translatable_serializer::config::Config;
use translatable_serializer::field::ValueKind;
use translatable_serializer::i18n::TranslationMetrics;
use translatable_serializer::{
    ModelField, ModelSchema, OperationContext, SerializerOptions, SqliteStore,
    TranslatableModel, TranslatableSerializer, TranslationStore,
};

/// Sample model: a slug on the article, title and body per language
fn article_model() -> Result<TranslatableModel> {
    let text = |max_length| ValueKind::Text { max_length };
    let model = TranslatableModel::new(
        ModelSchema::new("article").field(ModelField::new("slug", text(Some(50)))),
        ModelSchema::translations_for("article_translation")
            .field(ModelField::new("title", text(Some(200))))
            .field(ModelField::new("body", text(None)).optional()),
    )?;
    Ok(model)
}

fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("translatable_serializer=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let registry = config.registry();

    // Parse arguments: <entity-id> | --seed, plus --language <code>
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut query = HashMap::new();
    let mut entity_id = None;
    let mut seed = false;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--seed" => seed = true,
            "--language" => {
                let value = iter.next().context("--language needs a value")?;
                query.insert(config.language_query_key.clone(), value.clone());
            }
            other => {
                entity_id = Some(
                    other
                        .parse::<i64>()
                        .with_context(|| format!("Not an entity id: '{}'", other))?,
                );
            }
        }
    }

    info!("Opening store at {}", config.database_path);
    let store = SqliteStore::new(&config.database_path)?;

    let flat = TranslatableSerializer::new(
        article_model()?,
        SerializerOptions {
            languages: Some(registry.clone()),
            ..Default::default()
        },
    )?;
    let nested = TranslatableSerializer::new(
        article_model()?,
        SerializerOptions {
            translated_fields: false,
            nested_translations: true,
            languages: Some(registry.clone()),
            ..Default::default()
        },
    )?;

    let mut entity = match (entity_id, seed) {
        (_, true) => {
            let mut ctx = OperationContext::from_registry(&registry);
            let payload = json!({
                "slug": "hello-world",
                "translations": {
                    "en": {"title": "Hello, world", "body": "First post."},
                    "ja": {"title": "こんにちは世界", "body": "最初の投稿です。"},
                    "fr": {"title": "Bonjour le monde"}
                }
            });
            let entity = nested.save(&store, &mut ctx, None, &payload)?;
            info!("Seeded article {:?}", entity.id);
            entity
        }
        (Some(id), false) => store.load_entity(id)?,
        (None, false) => bail!("Usage: translatable-preview <entity-id> [--language <code>] | --seed"),
    };

    let mut ctx = OperationContext::for_request(
        &query,
        &config.language_query_key,
        registry.default_language().clone(),
    );
    info!(
        "Rendering article {:?} in '{}'",
        entity.id,
        ctx.effective_language()
    );

    let flat_repr = flat.to_representation(&store, &mut ctx, &mut entity)?;
    let nested_repr = nested.to_representation(&store, &mut ctx, &mut entity)?;

    println!("\n{}", "=".repeat(60));
    println!("FLAT ({})", ctx.effective_language());
    println!("{}", "=".repeat(60));
    println!("{}", serde_json::to_string_pretty(&flat_repr)?);
    println!("\n{}", "=".repeat(60));
    println!("NESTED");
    println!("{}", "=".repeat(60));
    println!("{}", serde_json::to_string_pretty(&nested_repr)?);
    println!("{}\n", "=".repeat(60));

    info!(
        "Translation metrics: {}",
        serde_json::to_string(&TranslationMetrics::global().report())?
    );
    Ok(())
}
