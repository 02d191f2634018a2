// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use anyhow::Context;
use comfy_table::Table;
use devicemap_kernel::{DeviceType, Flag, IdentifierKey, PropertyBag, RuleSet};
use devicemap_node::network::{ClassificationClient, DeviceLookup};
use serde::Serialize;

use super::table;
use crate::args::LookupArgs;

#[derive(Debug, Serialize)]
pub struct Classified<'a> {
    pub key: IdentifierKey,
    pub properties: PropertyBag,
    pub device_type: DeviceType,
    pub rules: Vec<&'a str>,
}

pub fn classify<'a>(rules: &'a RuleSet, properties: PropertyBag, user_agent: &str) -> Classified<'a> {
    let (device_type, fired) = rules.explain(&properties, user_agent);
    Classified {
        key: IdentifierKey::of(user_agent),
        properties,
        device_type,
        rules: fired,
    }
}

pub async fn run(args: &LookupArgs) -> anyhow::Result<()> {
    let cfg = args.config();
    cfg.validate()?;
    let client = ClassificationClient::new(&cfg)?;
    let properties = client
        .lookup(&args.user_agent)
        .await
        .with_context(|| format!("looking up {:?}", args.user_agent))?;

    let rules = RuleSet::default();
    let classified = classify(&rules, properties, &args.user_agent);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&classified)?);
    } else {
        println!("{}", render(&classified));
    }
    Ok(())
}

pub fn render(classified: &Classified<'_>) -> Table {
    let mut table = table(vec!["Field", "Value"]);
    table.add_row(vec!["key".to_string(), classified.key.cache_key()]);
    for flag in Flag::ALL {
        table.add_row(vec![flag.name().to_string(), classified.properties.flag(flag).to_string()]);
    }
    table.add_row(vec!["rules".to_string(), classified.rules.join(" -> ")]);
    table.add_row(vec!["device type".to_string(), classified.device_type.to_string()]);
    table
}
