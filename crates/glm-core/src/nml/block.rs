use super::literal::format_value;
use super::parser::parse_namelist;
use super::schema::{BlockSchema, DATETIME_FORMAT, LengthRule, ParamSpec, schema_for};
use crate::domain::{BlockKind, GlmError, GlmErrorKind, GlmResult, ParamValue};
use chrono::NaiveDateTime;
use tracing::debug;

const PARAM_INDENT: &str = "   ";

/// One namelist section. Values are held in the declaration order of the
/// block's schema, which is also the order they render in.
#[derive(Debug, Clone, PartialEq)]
pub struct NmlBlock {
    kind: BlockKind,
    values: Vec<Option<ParamValue>>,
}

impl NmlBlock {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            values: vec![None; schema_for(kind).params.len()],
        }
    }

    /// A block pre-filled with every declared default. Parameters without a
    /// default stay unset.
    pub fn with_defaults(kind: BlockKind) -> Self {
        let mut block = Self::new(kind);
        for (slot, spec) in block.values.iter_mut().zip(schema_for(kind).params) {
            *slot = spec.default.map(|default| default.to_value(spec.ty));
        }
        block
    }

    pub fn from_entries<I, K, V>(kind: BlockKind, entries: I) -> GlmResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ParamValue>,
    {
        let mut block = Self::new(kind);
        block.set_many(entries)?;
        Ok(block)
    }

    pub const fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn schema(&self) -> &'static BlockSchema {
        schema_for(self.kind)
    }

    /// Assigns one parameter after checking its name and type. Sibling
    /// length links are only checked by [`NmlBlock::set_many`] and
    /// [`NmlBlock::validate`], so linked values may be updated one at a time.
    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) -> GlmResult<()> {
        let (index, value) = self.check_assignment(name, value.into())?;
        debug!(block = %self.kind, param = self.schema().params[index].name, "set parameter");
        self.values[index] = Some(value);
        Ok(())
    }

    /// Assigns several parameters as one unit. Every entry is checked, then
    /// the length links of the resulting block; nothing is applied unless
    /// all checks pass.
    pub fn set_many<I, K, V>(&mut self, entries: I) -> GlmResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ParamValue>,
    {
        let mut staged = self.values.clone();
        let mut assigned = 0_usize;
        for (name, value) in entries {
            let (index, value) = self.check_assignment(name.as_ref(), value.into())?;
            staged[index] = Some(value);
            assigned += 1;
        }

        check_length_links(self.kind, &staged)?;
        debug!(block = %self.kind, assigned, "set parameters");
        self.values = staged;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        let index = self.schema().position(name)?;
        self.values[index].as_ref()
    }

    pub fn unset(&mut self, name: &str) -> GlmResult<Option<ParamValue>> {
        let index = self
            .schema()
            .position(name)
            .ok_or_else(|| GlmError::unknown_parameter(self.kind.name(), name))?;
        Ok(self.values[index].take())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.iter().filter(|value| value.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assigned parameters in render order, keyed by their canonical names.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> + '_ {
        self.schema()
            .params
            .iter()
            .zip(&self.values)
            .filter_map(|(spec, value)| value.as_ref().map(|value| (spec.name, value)))
    }

    /// Checks the rules that span several parameters of this block.
    pub fn validate(&self) -> GlmResult<()> {
        check_length_links(self.kind, &self.values)?;

        match self.kind {
            BlockKind::Morphometry => self.validate_morphometry(),
            BlockKind::Time => self.validate_time(),
            BlockKind::InitProfiles => self.validate_init_profiles(),
            _ => Ok(()),
        }
    }

    pub fn render(&self) -> String {
        let mut rendered = self.kind.header();
        rendered.push('\n');
        for (name, value) in self.iter() {
            rendered.push_str(PARAM_INDENT);
            rendered.push_str(name);
            rendered.push_str(" = ");
            rendered.push_str(&format_value(value));
            rendered.push('\n');
        }
        rendered.push('/');
        rendered
    }

    /// Reads exactly one block from namelist text.
    pub fn from_text(text: &str) -> GlmResult<Self> {
        let mut blocks = parse_namelist(text)?;
        if blocks.len() != 1 {
            return Err(GlmError::new(
                GlmErrorKind::Parse,
                format!("expected exactly one namelist block, found {}", blocks.len()),
            ));
        }

        let parsed = blocks.remove(0);
        let mut block = Self::new(parsed.kind);
        for entry in parsed.entries {
            block
                .set(&entry.name, entry.value)
                .map_err(|error| located(error, entry.source_line))?;
        }
        Ok(block)
    }

    fn check_assignment(&self, name: &str, value: ParamValue) -> GlmResult<(usize, ParamValue)> {
        let schema = self.schema();
        let index = schema
            .position(name)
            .ok_or_else(|| GlmError::unknown_parameter(self.kind.name(), name))?;
        let spec = &schema.params[index];
        let value = spec.ty.coerce(value).map_err(|reason| {
            GlmError::type_mismatch(format!(
                "parameter '{}' in '{}' {}",
                spec.name,
                self.kind.header(),
                reason
            ))
        })?;
        Ok((index, value))
    }

    fn real(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_real)
    }

    fn validate_morphometry(&self) -> GlmResult<()> {
        let heights = self.get("H").and_then(ParamValue::as_real_list);
        let areas = self.get("A").and_then(ParamValue::as_real_list);

        if let (Some(heights), Some(areas)) = (heights, areas)
            && heights.len() != areas.len()
        {
            return Err(GlmError::cross_field(format!(
                "'&morphometry' lists {} heights but {} areas",
                heights.len(),
                areas.len()
            )));
        }

        if let Some(heights) = heights
            && heights.windows(2).any(|pair| pair[1] <= pair[0])
        {
            return Err(GlmError::cross_field(
                "'&morphometry' heights 'H' must be strictly increasing",
            ));
        }

        if let Some(areas) = areas
            && areas.iter().any(|area| *area < 0.0)
        {
            return Err(GlmError::cross_field(
                "'&morphometry' areas 'A' must not be negative",
            ));
        }

        Ok(())
    }

    fn validate_time(&self) -> GlmResult<()> {
        let Some(timefmt) = self.get("timefmt").and_then(ParamValue::as_int) else {
            return Ok(());
        };

        let required: &[&str] = match timefmt {
            2 => &["start", "stop"],
            3 => &["start", "num_days"],
            other => {
                return Err(GlmError::cross_field(format!(
                    "'&time' timefmt must be 2 or 3, found {}",
                    other
                )));
            }
        };
        if let Some(missing) = required.iter().find(|name| !self.contains(name)) {
            return Err(GlmError::cross_field(format!(
                "'&time' timefmt {} requires '{}'",
                timefmt, missing
            )));
        }

        if timefmt == 2 {
            let start = self.datetime("start");
            let stop = self.datetime("stop");
            if let (Some(start), Some(stop)) = (start, stop)
                && stop <= start
            {
                return Err(GlmError::cross_field(
                    "'&time' stop must be later than start",
                ));
            }
        }

        if let Some(num_days) = self.get("num_days").and_then(ParamValue::as_int)
            && timefmt == 3
            && num_days <= 0
        {
            return Err(GlmError::cross_field("'&time' num_days must be positive"));
        }

        Ok(())
    }

    fn datetime(&self, name: &str) -> Option<NaiveDateTime> {
        let text = self.get(name)?.as_str()?;
        NaiveDateTime::parse_from_str(text, DATETIME_FORMAT).ok()
    }

    fn validate_init_profiles(&self) -> GlmResult<()> {
        let Some(lake_depth) = self.real("lake_depth") else {
            return Ok(());
        };
        if lake_depth <= 0.0 {
            return Err(GlmError::cross_field(
                "'&init_profiles' lake_depth must be positive",
            ));
        }

        if let Some(depths) = self.get("the_depths").and_then(ParamValue::as_real_list)
            && let Some(deepest) = depths.iter().copied().find(|depth| *depth > lake_depth)
        {
            return Err(GlmError::cross_field(format!(
                "'&init_profiles' depth {} exceeds lake_depth {}",
                deepest, lake_depth
            )));
        }

        Ok(())
    }
}

/// Attaches a source line to an assignment error raised while reading text.
/// Unknown names count as syntax errors there.
pub(super) fn located(error: GlmError, source_line: usize) -> GlmError {
    match error.kind() {
        GlmErrorKind::UnknownParameter => GlmError::parse(source_line, error.message()),
        kind => GlmError::new(kind, format!("line {}: {}", source_line, error.message())),
    }
}

fn check_length_links(kind: BlockKind, values: &[Option<ParamValue>]) -> GlmResult<()> {
    let schema = schema_for(kind);
    let count_of = |name: &'static str| -> GlmResult<Option<i64>> {
        let Some(index) = schema.position(name) else {
            return Ok(None);
        };
        match values[index].as_ref().and_then(ParamValue::as_int) {
            Some(count) if count < 0 => Err(GlmError::cross_field(format!(
                "count '{}' in '{}' must not be negative, found {}",
                name,
                kind.header(),
                count
            ))),
            count => Ok(count),
        }
    };

    for (spec, value) in schema.params.iter().zip(values) {
        let Some(actual) = value.as_ref().and_then(ParamValue::list_len) else {
            continue;
        };
        let Some((expected, rule)) = expected_length(kind, spec, &count_of)? else {
            continue;
        };
        if actual as i64 != expected {
            return Err(GlmError::cross_field(format!(
                "parameter '{}' in '{}' has {} values but {} requires {}",
                spec.name,
                kind.header(),
                actual,
                rule,
                expected
            )));
        }
    }

    Ok(())
}

fn expected_length(
    kind: BlockKind,
    spec: &ParamSpec,
    count_of: &impl Fn(&'static str) -> GlmResult<Option<i64>>,
) -> GlmResult<Option<(i64, String)>> {
    match spec.length {
        LengthRule::Free => Ok(None),
        LengthRule::Count(count) => Ok(count_of(count)?
            .map(|expected| (expected, format!("{} = {}", count, expected)))),
        LengthRule::Product(left, right) => {
            let (Some(left_value), Some(right_value)) = (count_of(left)?, count_of(right)?) else {
                return Ok(None);
            };
            let expected = left_value.checked_mul(right_value).ok_or_else(|| {
                GlmError::cross_field(format!(
                    "counts {} = {} and {} = {} in '{}' are too large to size '{}'",
                    left,
                    left_value,
                    right,
                    right_value,
                    kind.header(),
                    spec.name
                ))
            })?;
            Ok(Some((expected, format!("{} * {}", left, right))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NmlBlock;
    use crate::domain::{BlockKind, GlmErrorKind, ParamValue};

    #[test]
    fn set_then_get_returns_coerced_value() {
        let mut block = NmlBlock::new(BlockKind::GlmSetup);
        block.set("max_layers", 500).expect("integer should be accepted");
        block.set("min_layer_vol", 1).expect("integer should widen to real");

        assert_eq!(block.get("max_layers"), Some(&ParamValue::Int(500)));
        assert_eq!(block.get("min_layer_vol"), Some(&ParamValue::Real(1.0)));
        assert_eq!(block.len(), 2);
    }

    #[test]
    fn unknown_parameter_leaves_block_unchanged() {
        let mut block = NmlBlock::new(BlockKind::GlmSetup);
        let error = block
            .set("max_layerz", 10)
            .expect_err("misspelt name should fail");

        assert_eq!(error.kind(), GlmErrorKind::UnknownParameter);
        assert!(error.message().contains("max_layerz"));
        assert!(block.is_empty());
    }

    #[test]
    fn type_mismatch_names_expected_type() {
        let mut block = NmlBlock::new(BlockKind::GlmSetup);
        let error = block
            .set("non_avg", "yes")
            .expect_err("string for boolean should fail");

        assert_eq!(error.kind(), GlmErrorKind::TypeMismatch);
        assert!(error.message().contains("expects boolean, got string"));
    }

    #[test]
    fn set_many_is_all_or_nothing() {
        let mut block = NmlBlock::new(BlockKind::GlmSetup);
        block.set("sim_name", "Original").expect("set should succeed");

        let error = block
            .set_many([
                ("sim_name", ParamValue::from("Changed")),
                ("max_layers", ParamValue::from(500)),
                ("bogus", ParamValue::from(1)),
            ])
            .expect_err("unknown entry should fail the batch");

        assert_eq!(error.kind(), GlmErrorKind::UnknownParameter);
        assert_eq!(block.get("sim_name"), Some(&ParamValue::from("Original")));
        assert!(!block.contains("max_layers"));
    }

    #[test]
    fn set_many_checks_linked_lengths() {
        let mut block = NmlBlock::new(BlockKind::InitProfiles);
        let error = block
            .set_many([
                ("num_depths", ParamValue::from(3)),
                ("the_depths", ParamValue::from(vec![1.0, 2.0])),
            ])
            .expect_err("length mismatch should fail");

        assert_eq!(error.kind(), GlmErrorKind::CrossField);
        assert!(error.message().contains("num_depths = 3"));
        assert!(block.is_empty());
    }

    #[test]
    fn product_lengths_use_both_counts() {
        let block = NmlBlock::from_entries(
            BlockKind::InitProfiles,
            [
                ("num_depths", ParamValue::from(2)),
                ("num_wq_vars", ParamValue::from(2)),
                ("wq_names", ParamValue::from(vec!["OXY_oxy", "SIL_rsi"])),
                ("wq_init_vals", ParamValue::from(vec![1.0, 2.0, 3.0, 4.0])),
            ],
        );
        assert!(block.is_ok());

        let error = NmlBlock::from_entries(
            BlockKind::InitProfiles,
            [
                ("num_depths", ParamValue::from(2)),
                ("num_wq_vars", ParamValue::from(2)),
                ("wq_init_vals", ParamValue::from(vec![1.0, 2.0])),
            ],
        )
        .expect_err("product length mismatch should fail");
        assert!(error.message().contains("num_wq_vars * num_depths"));
    }

    #[test]
    fn oversized_product_counts_are_rejected() {
        let error = NmlBlock::from_entries(
            BlockKind::InitProfiles,
            [
                ("num_depths", ParamValue::from(4)),
                ("num_wq_vars", ParamValue::from(i64::MAX / 2)),
                ("wq_init_vals", ParamValue::from(vec![1.0])),
            ],
        )
        .expect_err("overflowing product should fail");

        assert_eq!(error.kind(), GlmErrorKind::CrossField);
        assert!(error.message().contains("num_wq_vars"));
        assert!(error.message().contains("num_depths = 4"));
    }

    #[test]
    fn negative_counts_are_rejected() {
        let mut block = NmlBlock::new(BlockKind::InitProfiles);
        let error = block
            .set_many([
                ("num_depths", ParamValue::from(-2)),
                ("the_depths", ParamValue::from(vec![1.0, 2.0])),
            ])
            .expect_err("negative count should fail");

        assert_eq!(error.kind(), GlmErrorKind::CrossField);
        assert!(error.message().contains("must not be negative"));
        assert!(block.is_empty());
    }

    #[test]
    fn defaults_are_only_applied_on_request() {
        assert!(NmlBlock::new(BlockKind::Time).is_empty());

        let block = NmlBlock::with_defaults(BlockKind::Time);
        assert_eq!(block.get("dt"), Some(&ParamValue::Real(3600.0)));
        assert_eq!(block.get("timefmt"), Some(&ParamValue::Int(2)));
        assert!(!block.contains("start"));
    }

    #[test]
    fn render_uses_schema_order_and_indentation() {
        let mut block = NmlBlock::new(BlockKind::Time);
        block.set("dt", 3600.0).expect("dt should be set");
        block.set("timefmt", 2).expect("timefmt should be set");

        assert_eq!(block.render(), "&time\n   timefmt = 2\n   dt = 3600.0\n/");
    }

    #[test]
    fn render_then_parse_reproduces_block() {
        let mut block = NmlBlock::new(BlockKind::Outflow);
        block
            .set_many([
                ("num_outlet", ParamValue::from(2)),
                ("outflow_fl", ParamValue::from(vec!["bcs/out1.csv", "bcs/out2.csv"])),
                ("outlet_type", ParamValue::from(vec![1_i64, 1])),
                ("flt_off_sw", ParamValue::from(vec![false, false])),
                ("outflow_factor", ParamValue::from(vec![1.0, 0.8])),
                ("seepage", ParamValue::from(true)),
            ])
            .expect("outflow block should be valid");

        let parsed = NmlBlock::from_text(&block.render()).expect("rendered block should parse");
        assert_eq!(parsed, block);
    }

    #[test]
    fn time_block_requires_fields_for_its_format() {
        let mut block = NmlBlock::new(BlockKind::Time);
        block.set("timefmt", 3).expect("timefmt should be set");
        block
            .set("start", "1997-01-01 00:00:00")
            .expect("start should be set");

        let error = block.validate().expect_err("num_days should be required");
        assert_eq!(error.kind(), GlmErrorKind::CrossField);
        assert!(error.message().contains("num_days"));

        block.set("num_days", 30).expect("num_days should be set");
        block.validate().expect("complete time block should validate");
    }

    #[test]
    fn morphometry_heights_must_increase() {
        let block = NmlBlock::from_entries(
            BlockKind::Morphometry,
            [
                ("bsn_vals", ParamValue::from(3)),
                ("H", ParamValue::from(vec![-2.0, -3.0, 0.0])),
                ("A", ParamValue::from(vec![1.0, 2.0, 3.0])),
            ],
        )
        .expect("lengths agree");

        let error = block.validate().expect_err("decreasing heights should fail");
        assert!(error.message().contains("strictly increasing"));
    }

    #[test]
    fn initial_depths_may_not_exceed_lake_depth() {
        let block = NmlBlock::from_entries(
            BlockKind::InitProfiles,
            [
                ("lake_depth", ParamValue::from(10.0)),
                ("num_depths", ParamValue::from(2)),
                ("the_depths", ParamValue::from(vec![1.0, 12.0])),
            ],
        )
        .expect("lengths agree");

        let error = block.validate().expect_err("depth beyond lake should fail");
        assert!(error.message().contains("exceeds lake_depth"));
    }

    #[test]
    fn from_text_reports_unknown_names_as_parse_errors() {
        let error = NmlBlock::from_text("&glm_setup\n   max_layerz = 1\n/\n")
            .expect_err("unknown name should fail");

        assert_eq!(error.kind(), GlmErrorKind::Parse);
        assert!(error.message().starts_with("line 2:"));
    }
}
