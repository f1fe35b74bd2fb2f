//! `evicta intent <prompt>`

use anyhow::Result;

use evicta::cache::{extract_intent, normalize_prompt, IntentGuard};
use evicta::config::Config;

pub(crate) fn cmd_intent(config: &Config, prompt: &str) -> Result<()> {
    let normalized = normalize_prompt(prompt);
    let guard = IntentGuard::new(config.intent.max_prompt_chars);

    println!("Input:       {:?}", prompt);
    println!("Normalized:  {:?}", normalized);

    if !config.intent.enabled {
        println!("Guardrail:   intent matching disabled by configuration");
        return Ok(());
    }
    if !guard.allows(&normalized) {
        println!(
            "Guardrail:   rejected (longer than {} chars, contains a digit, or spans lines)",
            guard.max_prompt_chars
        );
        return Ok(());
    }
    println!("Guardrail:   allowed");

    match extract_intent(&normalized) {
        Some(m) => {
            println!("Intent key:  {}", m.key());
            println!("Confidence:  {:.2}", m.confidence);
            println!("Noise:       {}", if m.noise_removed { "removed" } else { "none" });
        }
        None => println!("Intent key:  (no rule matched)"),
    }
    Ok(())
}
