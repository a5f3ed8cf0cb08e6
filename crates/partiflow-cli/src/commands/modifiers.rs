use super::load_frames;
use crate::cli::ModifiersArgs;
use crate::error::Result;
use partiflow::core::data::DataCollection;
use partiflow::engine::registry::ModifierRegistry;
use std::fmt::Write;

pub fn run(args: ModifiersArgs) -> Result<()> {
    let registry = ModifierRegistry::with_builtin();
    let sample = match &args.input {
        Some(path) => Some(load_frames(path)?.into_iter().next().unwrap_or_default()),
        None => None,
    };
    print!("{}", format_listing(&registry, sample.as_ref()));
    Ok(())
}

/// One line per registered modifier, in registration order. With sample data,
/// applicable modifiers are marked with `*`.
pub(crate) fn format_listing(registry: &ModifierRegistry, sample: Option<&DataCollection>) -> String {
    let applicable: Vec<&str> = sample
        .map(|data| {
            registry
                .applicable_to(data)
                .into_iter()
                .map(|class| class.type_name)
                .collect()
        })
        .unwrap_or_default();

    let mut out = String::new();
    for class in registry.classes() {
        let marker = match sample {
            Some(_) if applicable.contains(&class.type_name) => "* ",
            Some(_) => "  ",
            None => "",
        };
        let _ = writeln!(
            out,
            "{}{:<24} {}",
            marker, class.type_name, class.description
        );
    }
    out
}
