//! Filter compiler: structured search filters to URL query parameters.
//!
//! A [`FilterList`] is an immutable value. Hosts derive a new list with
//! [`FilterList::with_value`] and hand it to a source, which compiles it exactly once
//! while building the advanced-search request.

use crate::error::SourceError;
use serde::Serialize;

/// `(label, value)` pairs of a choice filter. The value is what goes on the wire.
pub type FilterOptions = &'static [(&'static str, &'static str)];

/// One search filter. Each kind knows how to compile itself to query pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Filter {
    /// Exactly one option; omitted from the query while it equals `default`.
    #[serde(rename_all = "camelCase")]
    Select {
        name: &'static str,
        param: &'static str,
        options: FilterOptions,
        default: usize,
        selected: usize,
    },
    /// Any number of options, one repeated parameter per checked option.
    #[serde(rename_all = "camelCase")]
    MultiSelect {
        name: &'static str,
        param: &'static str,
        options: FilterOptions,
        /// Option indexes in the order they were checked.
        checked: Vec<usize>,
    },
    /// Free-form integer validated against an inclusive range when compiled.
    #[serde(rename_all = "camelCase")]
    Scalar {
        name: &'static str,
        param: &'static str,
        min: i64,
        max: i64,
        input: String,
    },
}

impl Filter {
    /// Single choice whose default is the option bound to `default_value`, or the first
    /// option when that value is absent or not listed.
    pub fn select(
        name: &'static str,
        param: &'static str,
        options: FilterOptions,
        default_value: Option<&str>,
    ) -> Self {
        let default = default_value
            .and_then(|d| options.iter().position(|(_, v)| *v == d))
            .unwrap_or(0);
        Filter::Select {
            name,
            param,
            options,
            default,
            selected: default,
        }
    }

    pub fn multi_select(name: &'static str, param: &'static str, options: FilterOptions) -> Self {
        Filter::MultiSelect {
            name,
            param,
            options,
            checked: Vec::new(),
        }
    }

    pub fn scalar(name: &'static str, param: &'static str, min: i64, max: i64) -> Self {
        Filter::Scalar {
            name,
            param,
            min,
            max,
            input: String::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Filter::Select { name, .. }
            | Filter::MultiSelect { name, .. }
            | Filter::Scalar { name, .. } => *name,
        }
    }

    /// Return a copy with user input applied.
    ///
    /// Select takes one label or value. MultiSelect takes a comma-separated list of labels
    /// or values (empty input clears it). Scalar keeps the raw text; it is validated when
    /// compiled so that the request build fails, not the input step.
    pub fn with_input(&self, input: &str) -> Result<Self, SourceError> {
        let mut next = self.clone();
        match &mut next {
            Filter::Select {
                name,
                options,
                selected,
                ..
            } => {
                *selected = find_option(*options, input.trim()).ok_or_else(|| {
                    SourceError::validation(*name, format!("unknown option '{}'", input.trim()))
                })?;
            }
            Filter::MultiSelect {
                name,
                options,
                checked,
                ..
            } => {
                checked.clear();
                for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let idx = find_option(*options, part).ok_or_else(|| {
                        SourceError::validation(*name, format!("unknown option '{}'", part))
                    })?;
                    if !checked.contains(&idx) {
                        checked.push(idx);
                    }
                }
            }
            Filter::Scalar { input: current, .. } => *current = input.to_string(),
        }
        Ok(next)
    }

    /// Append this filter's query pairs to `out`. Defaults and empty selections emit nothing.
    pub fn compile_into(&self, out: &mut Vec<(String, String)>) -> Result<(), SourceError> {
        match self {
            Filter::Select {
                param,
                options,
                default,
                selected,
                ..
            } => {
                if selected != default {
                    if let Some((_, value)) = options.get(*selected) {
                        out.push((param.to_string(), value.to_string()));
                    }
                }
            }
            Filter::MultiSelect {
                param,
                options,
                checked,
                ..
            } => {
                for (_, value) in checked.iter().filter_map(|i| options.get(*i)) {
                    out.push((param.to_string(), value.to_string()));
                }
            }
            Filter::Scalar {
                name,
                param,
                min,
                max,
                input,
            } => {
                let v = input.trim();
                if v.is_empty() {
                    return Ok(());
                }
                let range_msg = || format!("must be an integer between {} and {}", min, max);
                let num: i64 = v
                    .parse()
                    .map_err(|_| SourceError::validation(*name, range_msg()))?;
                if num < *min || num > *max {
                    return Err(SourceError::validation(*name, range_msg()));
                }
                out.push((param.to_string(), num.to_string()));
            }
        }
        Ok(())
    }
}

fn find_option(options: FilterOptions, input: &str) -> Option<usize> {
    options
        .iter()
        .position(|(label, _)| label.eq_ignore_ascii_case(input))
        .or_else(|| options.iter().position(|(_, value)| *value == input))
}

/// Ordered, immutable set of filters offered by one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FilterList(Vec<Filter>);

impl FilterList {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self(filters)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return a new list where the filter called `name` (case-insensitive) has `input` applied.
    pub fn with_value(&self, name: &str, input: &str) -> Result<Self, SourceError> {
        let pos = self
            .0
            .iter()
            .position(|f| f.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| SourceError::validation(name.trim(), "no such filter for this source"))?;
        let mut filters = self.0.clone();
        filters[pos] = filters[pos].with_input(input)?;
        Ok(Self(filters))
    }

    /// Compile every filter in declaration order, then append `page=N`.
    ///
    /// The first invalid scalar aborts compilation, so no request is ever built from it.
    pub fn compile(&self, page: u32) -> Result<Vec<(String, String)>, SourceError> {
        let mut out = Vec::new();
        for filter in &self.0 {
            filter.compile_into(&mut out)?;
        }
        out.push(("page".to_string(), page.to_string()));
        Ok(out)
    }
}
