// Renderer: walks the registry and turns each section into an outcome

use tracing::{info, warn};

use crate::data::RecordSet;
use crate::derive::Derived;
use crate::graph::{ChartBackend, PlottersBackend};
use crate::ir::{ChartSpec, Entry, Outcome, RenderResult, RenderedChart, Section, SkipReason, Source};
use crate::transform;
use crate::RenderOptions;

/// Lazy iterator over the registry; each `next()` renders one section
pub struct Renderer<'a, B: ChartBackend> {
    derived: &'a Derived,
    sections: std::iter::Enumerate<std::slice::Iter<'a, Section>>,
    options: &'a RenderOptions,
    backend: B,
}

/// Render with the plotters backend
pub fn render<'a>(
    derived: &'a Derived,
    sections: &'a [Section],
    options: &'a RenderOptions,
) -> Renderer<'a, PlottersBackend> {
    render_with(derived, sections, options, PlottersBackend)
}

/// Render with a caller-supplied backend
pub fn render_with<'a, B: ChartBackend>(
    derived: &'a Derived,
    sections: &'a [Section],
    options: &'a RenderOptions,
    backend: B,
) -> Renderer<'a, B> {
    Renderer {
        derived,
        sections: sections.iter().enumerate(),
        options,
        backend,
    }
}

impl<'a, B: ChartBackend> Iterator for Renderer<'a, B> {
    type Item = RenderResult;

    fn next(&mut self) -> Option<RenderResult> {
        let (index, section) = self.sections.next()?;
        let outcome = match &section.entry {
            Entry::Preview { rows } => self.render_preview(*rows),
            Entry::Chart(spec) => self.render_chart(spec),
        };

        match &outcome {
            Outcome::Skip(SkipReason::MissingColumns(cols)) => {
                info!(index, heading = %section.heading, missing = ?cols, "section skipped")
            }
            Outcome::Skip(reason) => {
                warn!(index, heading = %section.heading, %reason, "section failed")
            }
            Outcome::Chart(chart) => {
                info!(index, heading = %section.heading, kind = chart.kind, "chart rendered")
            }
            Outcome::Table(table) => {
                info!(index, heading = %section.heading, rows = table.len(), "preview rendered")
            }
        }

        Some(RenderResult {
            index,
            heading: section.heading.clone(),
            outcome,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.sections.size_hint()
    }
}

impl<'a, B: ChartBackend> Renderer<'a, B> {
    fn source_frame(&self, source: Source) -> Option<&'a RecordSet> {
        match source {
            Source::Records => Some(&self.derived.records),
            Source::SpeciesMeans => self.derived.species_means.as_ref(),
        }
    }

    /// First rows of the dataset as loaded, without derived columns
    fn render_preview(&self, rows: usize) -> Outcome {
        match self.derived.records.head(rows).select(&self.derived.source_headers) {
            Ok(table) => Outcome::Table(table),
            Err(e) => Outcome::Skip(SkipReason::Failed(format!("{:#}", e))),
        }
    }

    fn render_chart(&self, spec: &ChartSpec) -> Outcome {
        let required = spec.kind.required_columns();

        // Columns missing from the main records take precedence in the reason,
        // so an absent means table reads the same as its inputs being absent.
        let frame = match self.source_frame(spec.source) {
            Some(frame) => frame,
            None => {
                let missing = self.derived.records.missing_columns(&required);
                return Outcome::Skip(if missing.is_empty() {
                    SkipReason::Failed("species means unavailable".to_string())
                } else {
                    SkipReason::MissingColumns(missing)
                });
            }
        };

        let missing = frame.missing_columns(&required);
        if !missing.is_empty() {
            return Outcome::Skip(SkipReason::MissingColumns(missing));
        }

        let drawn = transform::prepare_figure(spec, frame).and_then(|figure| {
            let image = self.backend.draw(&spec.title, &figure, self.options)?;
            Ok((figure, image))
        });

        match drawn {
            Ok((figure, image)) => Outcome::Chart(RenderedChart {
                title: spec.title.clone(),
                kind: spec.kind.name(),
                figure,
                image,
            }),
            Err(e) => Outcome::Skip(SkipReason::Failed(format!("{:#}", e))),
        }
    }
}
