use anyhow::{anyhow, Context};
use colored::Colorize;
use mbs_server::{Interceptor, QueryExp};
use mbs_types::{Attribute, ObjectName, Value};
use serde_json::json;

use crate::cli::*;
use crate::runtime;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let server = runtime::start(cli.config.as_deref())?;
    let format = cli.format;
    match cli.command {
        Command::Domains => cmd_domains(&server, &format),
        Command::Query(args) => cmd_query(&server, &format, args),
        Command::Info(args) => cmd_info(&server, &format, args),
        Command::Get(args) => cmd_get(&server, &format, args),
        Command::Set(args) => cmd_set(&server, &format, args),
        Command::Invoke(args) => cmd_invoke(&server, &format, args),
    }
}

fn parse_name(text: &str) -> anyhow::Result<ObjectName> {
    ObjectName::parse(text).with_context(|| format!("bad object name {text:?}"))
}

/// JSON if it parses, a plain string otherwise.
fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_domains(server: &Interceptor, format: &OutputFormat) -> anyhow::Result<()> {
    let domains = server.get_domains()?;
    match format {
        OutputFormat::Json => print_json(&json!(domains)),
        OutputFormat::Text => {
            println!("Default domain: {}", server.default_domain().yellow());
            for domain in &domains {
                println!("  {}", domain.bold());
            }
            Ok(())
        }
    }
}

fn cmd_query(server: &Interceptor, format: &OutputFormat, args: QueryArgs) -> anyhow::Result<()> {
    let pattern = args.pattern.as_deref().map(parse_name).transpose()?;
    let query = args
        .filter
        .as_deref()
        .map(serde_json::from_str::<QueryExp>)
        .transpose()
        .context("bad query expression")?;
    let beans = server.query_beans(pattern.as_ref(), query.as_ref())?;

    match format {
        OutputFormat::Json => print_json(&json!(beans)),
        OutputFormat::Text => {
            for bean in &beans {
                println!(
                    "{}  {}",
                    bean.name.to_string().bold(),
                    bean.class_name().unwrap_or("?").cyan()
                );
            }
            println!("{} bean(s)", beans.len());
            Ok(())
        }
    }
}

fn cmd_info(server: &Interceptor, format: &OutputFormat, args: InfoArgs) -> anyhow::Result<()> {
    let name = parse_name(&args.name)?;
    let info = server.get_bean_info(&name)?;
    if let OutputFormat::Json = format {
        return print_json(&json!(info));
    }

    println!("{} ({})", name.to_string().bold(), info.class_name.cyan());
    if !info.description.is_empty() {
        println!("  {}", info.description.dimmed());
    }
    if !info.attributes.is_empty() {
        println!("Attributes:");
        for a in &info.attributes {
            let access = match (a.readable, a.writable) {
                (true, true) => "rw",
                (true, false) => "r",
                _ => "w",
            };
            println!("  {:<2} {} : {}", access.green(), a.name.bold(), a.type_name);
        }
    }
    if !info.operations.is_empty() {
        println!("Operations:");
        for op in &info.operations {
            println!(
                "  {}({}) -> {}",
                op.name.bold(),
                op.signature().join(", "),
                op.return_type
            );
        }
    }
    if !info.notifications.is_empty() {
        println!("Notifications:");
        for n in &info.notifications {
            println!("  {} {}", n.name.bold(), n.types.join(", ").yellow());
        }
    }
    Ok(())
}

fn cmd_get(server: &Interceptor, format: &OutputFormat, args: GetArgs) -> anyhow::Result<()> {
    let name = parse_name(&args.name)?;
    let wanted = if args.attributes.is_empty() {
        server
            .get_bean_info(&name)?
            .attributes
            .into_iter()
            .filter(|a| a.readable)
            .map(|a| a.name)
            .collect()
    } else {
        args.attributes
    };
    let values = server.get_attributes(&name, &wanted)?;

    match format {
        OutputFormat::Json => print_json(&json!(values)),
        OutputFormat::Text => {
            for Attribute { name, value } in &values {
                println!("{} = {}", name.bold(), value);
            }
            for missing in wanted.iter().filter(|w| !values.iter().any(|v| &v.name == *w)) {
                println!("{} {}", missing.bold(), "(unavailable)".red());
            }
            Ok(())
        }
    }
}

fn cmd_set(server: &Interceptor, format: &OutputFormat, args: SetArgs) -> anyhow::Result<()> {
    let name = parse_name(&args.name)?;
    server.set_attribute(&name, Attribute::new(args.attribute.as_str(), parse_value(&args.value)))?;
    let value = server.get_attribute(&name, &args.attribute)?;
    match format {
        OutputFormat::Json => print_json(&json!({ "name": args.attribute, "value": value })),
        OutputFormat::Text => {
            println!("{} {} = {}", "✓".green().bold(), args.attribute.bold(), value);
            Ok(())
        }
    }
}

fn cmd_invoke(server: &Interceptor, format: &OutputFormat, args: InvokeArgs) -> anyhow::Result<()> {
    let name = parse_name(&args.name)?;
    let info = server.get_bean_info(&name)?;
    let operation = info
        .operations
        .iter()
        .find(|op| op.name == args.operation && op.parameters.len() == args.params.len())
        .ok_or_else(|| {
            anyhow!(
                "{} has no operation {} taking {} parameter(s)",
                name,
                args.operation,
                args.params.len()
            )
        })?;
    let signature: Vec<String> = operation.signature().into_iter().map(String::from).collect();
    let params: Vec<Value> = args.params.iter().map(|p| parse_value(p)).collect();

    let result = server.invoke(&name, &args.operation, &params, &signature)?;
    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Text => {
            println!("{} {} -> {}", "✓".green().bold(), args.operation.bold(), result);
            Ok(())
        }
    }
}
