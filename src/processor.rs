//! One pass of the filter: variable expansion followed by template rendering,
//! either of which can be switched off.

use log::debug;
use std::borrow::Cow;
use std::io::{BufRead, Read, Write};

use crate::{
    context::Snapshot,
    error::{Error, Result},
    expand::{expand, expand_bytes},
    renderer::TemplateRenderer,
};

/// Which stages run over the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    pub expand: bool,
    pub template: bool,
}

impl Mode {
    /// # Errors
    /// * `Error::OptionsError` if both stages are disabled
    pub fn new(expand: bool, template: bool) -> Result<Self> {
        if !expand && !template {
            return Err(Error::OptionsError("must expand or template".to_string()));
        }
        Ok(Self { expand, template })
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self {
            expand: true,
            template: true,
        }
    }
}

/// Runs input through the enabled stages.
pub struct Processor<'a> {
    renderer: &'a dyn TemplateRenderer,
    snapshot: &'a Snapshot,
    mode: Mode,
    debug: bool,
}

impl<'a> Processor<'a> {
    pub fn new(
        renderer: &'a dyn TemplateRenderer,
        snapshot: &'a Snapshot,
        mode: Mode,
        debug: bool,
    ) -> Self {
        debug!("Processing with {mode:?}, debug: {debug}");
        Self {
            renderer,
            snapshot,
            mode,
            debug,
        }
    }

    /// Expands `${VAR}` references from the snapshot's environment, then renders
    /// the result as a template.
    ///
    /// # Errors
    /// * `Error::TemplateError` if the template stage fails
    pub fn substitute(&self, input: &str) -> Result<String> {
        let expanded = if self.mode.expand {
            expand(input, |name| self.snapshot.getenv(name))
        } else {
            Cow::Borrowed(input)
        };

        if !self.mode.template {
            return Ok(expanded.into_owned());
        }

        let context = self.snapshot.global_context(self.debug);
        self.renderer.render(&expanded, &context)
    }

    /// Like [`Processor::substitute`], but over raw bytes.
    ///
    /// Expansion alone passes bytes that are not UTF-8 through unchanged; only
    /// the template stage requires UTF-8.
    ///
    /// # Errors
    /// * `Error::Utf8Error` if the template stage runs and `input` is not UTF-8
    /// * `Error::TemplateError` if the template stage fails
    pub fn substitute_bytes<'i>(&self, input: &'i [u8]) -> Result<Cow<'i, [u8]>> {
        if self.mode.template {
            let text = std::str::from_utf8(input)?;
            return Ok(Cow::Owned(self.substitute(text)?.into_bytes()));
        }
        Ok(expand_bytes(input, |name| self.snapshot.getenv(name)))
    }

    /// Reads `reader` to the end and writes the substituted result once.
    pub fn process_all<R: Read, W: Write>(&self, mut reader: R, mut writer: W) -> Result<()> {
        let mut input = Vec::new();
        reader.read_to_end(&mut input)?;
        debug!("Read {} bytes of input", input.len());

        writer.write_all(&self.substitute_bytes(&input)?)?;
        writer.flush()?;
        Ok(())
    }

    /// Substitutes `reader` one line at a time, flushing after each line.
    ///
    /// A trailing line with no newline is discarded at end of input, as
    /// line-oriented shell filters do.
    pub fn process_lines<R: BufRead, W: Write>(&self, mut reader: R, mut writer: W) -> Result<()> {
        let mut line = Vec::new();
        loop {
            line.clear();
            reader.read_until(b'\n', &mut line)?;
            if line.last() != Some(&b'\n') {
                if !line.is_empty() {
                    debug!("Discarding {} bytes after the last newline", line.len());
                }
                return Ok(());
            }
            writer.write_all(&self.substitute_bytes(&line)?)?;
            writer.flush()?;
        }
    }
}
