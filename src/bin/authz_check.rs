//!
//! authz_check
//! -----------
//! Evaluate one permission check against a grants JSON file and print the decision.
//! Exit code: 0 allowed, 1 denied, 2 error.

use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use std::env;
use std::sync::Arc;

use course_authz::{EvaluatorConfig, JsonFileSource, PermissionCheck, PermissionEvaluator, Principal};

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn required(args: &[String], flag: &str) -> Result<String> {
    arg_value(args, flag).ok_or_else(|| anyhow!("missing required option {}", flag))
}

fn parse_context(raw: Option<String>) -> Result<Map<String, Value>> {
    match raw {
        None => Ok(Map::new()),
        Some(text) => match serde_json::from_str::<Value>(&text).context("--context is not valid JSON")? {
            Value::Object(m) => Ok(m),
            _ => Err(anyhow!("--context must be a JSON object")),
        },
    }
}

async fn run(args: &[String]) -> Result<bool> {
    let grants = required(args, "--grants")?;
    let role = required(args, "--role")?;
    let id = arg_value(args, "--id").unwrap_or_else(|| "anonymous".to_string());
    let resource = required(args, "--resource")?;
    let action = required(args, "--action")?;
    let context = parse_context(arg_value(args, "--context"))?;

    let mut cfg = EvaluatorConfig::from_env();
    if let Some(ms) = arg_value(args, "--cache-timeout-ms").and_then(|v| v.parse::<u64>().ok()) {
        cfg.cache_timeout_ms = ms;
    }
    let evaluator = PermissionEvaluator::new(Arc::new(JsonFileSource::new(&grants)), &cfg);
    let principal = Principal::new(id, role);
    let check = PermissionCheck { resource, action, context };
    let allow = evaluator
        .check_permission(&principal, &check)
        .await
        .with_context(|| format!("loading grants from {}", grants))?;

    let out = serde_json::json!({
        "allow": allow,
        "user": principal.id,
        "role": principal.role,
        "resource": check.resource,
        "action": check.action,
    });
    println!("{}", out);
    Ok(allow)
}

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let args: Vec<String> = env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("authz_check\n\nUSAGE:\n  authz_check --grants PATH --role ROLE [--id ID] --resource R --action A [--context JSON] [--cache-timeout-ms N]\n\nOPTIONS:\n  --grants PATH          Grants document ({{\"roles\":{{\"<role>\":[...]}}}})\n  --role ROLE            Principal role\n  --id ID                Principal id (default: anonymous)\n  --resource R           Resource tag, e.g. course\n  --action A             Action tag, e.g. read\n  --context JSON         Check context object, e.g. '{{\"resource\":{{\"userId\":\"u1\"}}}}'\n  --cache-timeout-ms N   Role cache timeout (env: COURSE_AUTHZ_CACHE_TIMEOUT_MS)\n");
        return;
    }

    let code = match run(&args).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("error: {:#}", e);
            2
        }
    };
    std::process::exit(code);
}
