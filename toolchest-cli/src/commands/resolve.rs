//! `toolchest resolve` - dry-run catalog resolution.
//!
//! Prints the resolved descriptor set for a platform without downloading
//! anything. Useful for validating a catalog before shipping it.

use std::path::PathBuf;

use crate::error::CliError;

use super::load_descriptors;

pub fn run_resolve(
    catalog_path: PathBuf,
    platform: Option<String>,
    arch: Option<String>,
) -> Result<(), CliError> {
    let descriptors = load_descriptors(&catalog_path, platform.as_deref(), arch.as_deref())?;

    println!("{} component(s) resolved:", descriptors.len());
    for descriptor in &descriptors {
        let digest = match &descriptor.digest {
            Some(d) => format!("{}:{}...", d.algorithm, &d.hex[..16.min(d.hex.len())]),
            None => "unverified".to_string(),
        };
        let deps = if descriptor.dependencies.is_empty() {
            "-".to_string()
        } else {
            descriptor.dependencies.join(", ")
        };

        println!();
        println!(
            "  {} ({} {})",
            descriptor.id, descriptor.display_name, descriptor.version
        );
        println!("    url:     {}", descriptor.url);
        println!("    digest:  {}", digest);
        println!("    action:  {}", descriptor.action);
        println!("    deps:    {}", deps);
        if !descriptor.mandatory {
            println!("    optional");
        }
    }

    Ok(())
}
