use eyre::EyreHandler;
use itertools::Itertools;
use std::{error::Error, fmt};

/// Reports errors as their deduplicated chain of causes.
#[derive(Debug, Default)]
pub struct Handler;

impl EyreHandler for Handler {
    fn display(&self, error: &(dyn Error + 'static), f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Display;
        dedup_chain(error).into_iter().format("; ").fmt(f)
    }

    fn debug(&self, error: &(dyn Error + 'static), f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return fmt::Debug::fmt(error, f);
        }
        let errors = dedup_chain(error);
        let Some((error, sources)) = errors.split_first() else { return Ok(()) };
        write!(f, "{error}")?;

        if !sources.is_empty() {
            write!(f, "\n\nContext:")?;
            let multiple = sources.len() > 1;
            for (n, error) in sources.iter().enumerate() {
                writeln!(f)?;
                if multiple {
                    write!(f, "- Error #{n}: {error}")?;
                } else {
                    write!(f, "- {error}")?;
                }
            }
        }
        Ok(())
    }
}

/// Installs [`Handler`] as the global [`eyre`] hook.
pub fn install() {
    let hook = Box::new(|_: &(dyn Error + 'static)| -> Box<dyn EyreHandler> { Box::new(Handler) });
    if let Err(err) = eyre::set_hook(hook) {
        debug!("failed to install eyre error hook: {err}");
    }
}

/// Messages of `error` and its sources, dropping a cause already contained in its parent.
pub fn dedup_chain(error: &(dyn Error + 'static)) -> Vec<String> {
    let mut causes: Vec<String> = std::iter::successors(Some(error), |&err| err.source())
        .map(|cause| cause.to_string().trim().to_string())
        .collect();
    // `msg1: msg2; msg2` -> `msg1: msg2`
    causes.dedup_by(|b, a| a.contains(b.as_str()));
    causes
}
