use anyhow::{Context, Result};
use serde_json::Value;
use std::str::FromStr;

use hnapi::cache::CacheHooks;
use hnapi::config::Config;
use hnapi::gateway::Gateway;
use hnapi::models::ListingKind;
use hnapi::upstream::FetchContext;

/// Resource addressed by `hnapi fetch`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Listing(ListingKind),
    Item,
    Comments,
    NewComments,
    User,
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "item" | "post" => Ok(Self::Item),
            "comments" => Ok(Self::Comments),
            "newcomments" => Ok(Self::NewComments),
            "user" => Ok(Self::User),
            other => other
                .parse()
                .map(Self::Listing)
                .map_err(|_| format!("Unknown resource: {other}")),
        }
    }
}

/// Run one gateway operation and print the JSON result
pub async fn fetch(config: &Config, resource: Resource, arg: Option<String>, page: u32) -> Result<()> {
    let gateway = Gateway::from_config(config, CacheHooks::default())
        .await
        .context("Failed to build gateway")?;
    let context = FetchContext::default();

    let value: Value = match resource {
        Resource::Listing(kind) => serde_json::to_value(gateway.listing(kind, page, &context).await?)?,
        Resource::Item => {
            let id: u64 = required(arg, "item id")?
                .parse()
                .context("Item id must be numeric")?;
            serde_json::to_value(gateway.post(id, &context).await?)?
        }
        Resource::Comments => {
            let token = required(arg, "continuation token")?;
            serde_json::to_value(gateway.comments(&token, &context).await?)?
        }
        Resource::NewComments => serde_json::to_value(gateway.new_comments(&context).await?)?,
        Resource::User => {
            let id = required(arg, "user id")?;
            serde_json::to_value(gateway.user(&id, &context).await?)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn required(arg: Option<String>, what: &str) -> Result<String> {
    arg.filter(|a| !a.is_empty())
        .with_context(|| format!("Missing {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_parsing() {
        assert_eq!("item".parse::<Resource>(), Ok(Resource::Item));
        assert_eq!("NEWCOMMENTS".parse::<Resource>(), Ok(Resource::NewComments));
        assert_eq!(
            "best".parse::<Resource>(),
            Ok(Resource::Listing(ListingKind::Best))
        );
        assert!("frontpage".parse::<Resource>().is_err());
    }

    #[test]
    fn test_required_argument() {
        assert!(required(None, "user id").is_err());
        assert!(required(Some(String::new()), "user id").is_err());
        assert_eq!(required(Some("pg".into()), "user id").unwrap(), "pg");
    }
}
