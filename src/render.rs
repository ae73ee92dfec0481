use crate::config::{CanvasConfig, RenderConfig};
use crate::hittest::HitIndex;
use crate::legend::render_legend;
use crate::projection::Projection;
use crate::scale::{ColorScale, ScaleRegistry};
use crate::svg::{Element, Node};
use crate::tooltip::TooltipContent;
use crate::types::{Dataset, GeoFeature, VariableKey, ZipRecord};
use rayon::prelude::*;
use tracing::debug;

/// Everything a draw needs: the loaded inputs, the derived projection and
/// path data, and the live document. The active variable is the only state
/// that changes after construction.
pub struct RenderContext {
    dataset: Dataset,
    features: Vec<GeoFeature>,
    paths: Vec<Option<String>>,
    projection: Projection,
    hits: HitIndex,
    canvas: CanvasConfig,
    options: RenderConfig,
    registry: ScaleRegistry,
    document: Element,
    active: Option<VariableKey>,
}

/// Per-path attributes computed for one draw.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStyle {
    pub d: Option<String>,
    pub fill: String,
    pub zipcode: Option<String>,
    pub tooltip: String,
}

impl RenderContext {
    pub fn new(
        records: Vec<ZipRecord>,
        features: Vec<GeoFeature>,
        canvas: CanvasConfig,
        options: RenderConfig,
    ) -> Self {
        let projection = Projection::fit_size(canvas.width, canvas.height, &features);

        // Geometry never changes between draws, only fills and the legend.
        let paths: Vec<Option<String>> = features
            .par_iter()
            .map(|f| f.geometry.as_ref().map(|g| projection.path(g)))
            .collect();
        let hits = HitIndex::build(&features);

        let document = Element::new("svg")
            .attr("xmlns", "http://www.w3.org/2000/svg")
            .attr("width", canvas.width + canvas.legend_margin)
            .attr("height", canvas.height);

        debug!(
            scale = projection.scale,
            features = features.len(),
            "Projection fitted"
        );

        Self {
            dataset: Dataset::new(records),
            features,
            paths,
            projection,
            hits,
            canvas,
            options,
            registry: ScaleRegistry::default(),
            document,
            active: None,
        }
    }

    pub fn active(&self) -> Option<VariableKey> {
        self.active
    }

    pub fn document(&self) -> &Element {
        &self.document
    }

    pub fn svg(&self) -> String {
        self.document.to_string()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// The joined record for a feature, if any.
    pub fn record_for(&self, feature: &GeoFeature) -> Option<&ZipRecord> {
        feature.zcta5.as_deref().and_then(|z| self.dataset.lookup(z))
    }

    fn is_present(&self, value: Option<f64>) -> Option<f64> {
        value
            .filter(|v| !v.is_nan())
            .filter(|v| !(self.options.zero_is_missing && *v == 0.0))
    }

    /// Fill color for `feature` under `scale`.
    pub fn fill_for(&self, feature: &GeoFeature, variable: VariableKey, scale: &ColorScale) -> String {
        let value = self.record_for(feature).and_then(|r| variable.value_of(r));
        match self.is_present(value) {
            Some(v) => scale.color(v).to_string(),
            None => self.options.fallback_fill.clone(),
        }
    }

    pub fn tooltip_for(&self, feature: &GeoFeature, variable: VariableKey) -> TooltipContent {
        let record = self.record_for(feature);
        TooltipContent {
            zipcode: feature.zcta5.clone().unwrap_or_default(),
            neighborhood: record.and_then(|r| r.neighborhood.clone()),
            label: variable.label(),
            value: record.and_then(|r| variable.value_of(r)),
        }
    }

    /// Tooltip for the feature under pixel (x, y) on the active map.
    pub fn hover_at(&self, x: f64, y: f64) -> Option<TooltipContent> {
        let variable = self.active?;
        let (lon, lat) = self.projection.invert(x, y);
        let index = self.hits.locate(&self.features, lon, lat)?;
        Some(self.tooltip_for(&self.features[index], variable))
    }

    fn path_styles(&self, variable: VariableKey, scale: &ColorScale) -> Vec<PathStyle> {
        self.features
            .iter()
            .zip(&self.paths)
            .map(|(feature, d)| PathStyle {
                d: d.clone(),
                fill: self.fill_for(feature, variable, scale),
                zipcode: feature.zcta5.clone(),
                tooltip: self.tooltip_for(feature, variable).html(),
            })
            .collect()
    }

    /// Draws the map for `variable`: one path per feature, matched to the
    /// existing paths by position, then rebuilds the legend.
    pub fn render(&mut self, variable: VariableKey) {
        let values = self.dataset.values(variable);
        let scale = self.registry.activate(variable, &values);
        let styles = self.path_styles(variable, &scale);

        let slots: Vec<usize> = self
            .document
            .children
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n, Node::Element(e) if e.tag == "path"))
            .map(|(i, _)| i)
            .collect();

        // exit
        for &slot in slots.iter().skip(styles.len()).rev() {
            self.document.children.remove(slot);
        }
        // update
        for (&slot, style) in slots.iter().zip(&styles) {
            if let Node::Element(path) = &mut self.document.children[slot] {
                apply_style(path, style);
            }
        }
        // enter
        for style in styles.iter().skip(slots.len()) {
            let mut path = Element::new("path");
            apply_style(&mut path, style);
            self.document.append(path);
        }

        render_legend(&mut self.document, &self.canvas, variable, &values, &scale);
        self.active = Some(variable);

        debug!(
            variable = %variable,
            paths = styles.len(),
            domain = ?scale.domain,
            "Rendered map"
        );
    }
}

fn apply_style(path: &mut Element, style: &PathStyle) {
    match &style.d {
        Some(d) => path.set_attr("d", d),
        None => path.remove_attr("d"),
    }
    path.set_attr("fill", &style.fill);
    match &style.zipcode {
        Some(z) => path.set_attr("data-zip", z),
        None => path.remove_attr("data-zip"),
    }
    path.set_attr("data-tooltip", &style.tooltip);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::Ramp;
    use geo::{polygon, MultiPolygon};

    fn feature(zip: &str, lon: f64) -> GeoFeature {
        GeoFeature {
            zcta5: Some(zip.to_string()),
            geometry: Some(MultiPolygon::new(vec![polygon![
                (x: lon, y: 40.0),
                (x: lon + 0.1, y: 40.0),
                (x: lon + 0.1, y: 40.1),
                (x: lon, y: 40.1),
            ]])),
        }
    }

    fn record(zip: &str, sleep: f64, poverty: f64) -> ZipRecord {
        ZipRecord {
            zipcode: zip.to_string(),
            neighborhood: Some(format!("Area {}", zip)),
            sleep_deprivation: Some(sleep),
            median_income: Some(50_000.0),
            education_ba_plus: Some(30.0),
            poverty_rate: Some(poverty),
        }
    }

    fn context(records: Vec<ZipRecord>, features: Vec<GeoFeature>) -> RenderContext {
        RenderContext::new(records, features, CanvasConfig::default(), RenderConfig::default())
    }

    fn fills(ctx: &RenderContext) -> Vec<String> {
        ctx.document()
            .elements()
            .filter(|e| e.tag == "path")
            .map(|e| e.get_attr("fill").unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn single_record_uses_domain_midpoint() {
        let mut ctx = context(
            vec![ZipRecord {
                zipcode: "10001".into(),
                sleep_deprivation: Some(42.5),
                ..Default::default()
            }],
            vec![feature("10001", -74.0)],
        );
        ctx.render(VariableKey::SleepDeprivation);
        assert_eq!(fills(&ctx), vec![Ramp::Reds.interpolate(0.5).to_string()]);
        let tooltip = ctx.document().elements().next().unwrap().get_attr("data-tooltip").unwrap().to_string();
        assert!(tooltip.contains("Zip Code: 10001"));
        assert!(tooltip.contains("42.50"));
    }

    #[test]
    fn unmatched_and_zero_values_get_fallback() {
        let mut ctx = context(
            vec![record("1", 10.0, 0.0), record("2", 20.0, 5.0)],
            vec![feature("1", -74.0), feature("2", -73.8), feature("3", -73.6)],
        );
        ctx.render(VariableKey::PovertyRate);
        let scale = ColorScale::activate(VariableKey::PovertyRate, &[0.0, 5.0]);
        assert_eq!(
            fills(&ctx),
            vec!["#ccc".to_string(), scale.color(5.0).to_string(), "#ccc".to_string()]
        );
    }

    #[test]
    fn zero_is_colored_when_configured() {
        let options = RenderConfig {
            zero_is_missing: false,
            ..RenderConfig::default()
        };
        let mut ctx = RenderContext::new(
            vec![record("1", 10.0, 0.0), record("2", 20.0, 5.0)],
            vec![feature("1", -74.0)],
            CanvasConfig::default(),
            options,
        );
        ctx.render(VariableKey::PovertyRate);
        assert_eq!(fills(&ctx), vec![Ramp::Oranges.interpolate(0.0).to_string()]);
    }

    #[test]
    fn every_variable_keeps_path_cardinality_and_single_legend() {
        let features = vec![feature("1", -74.0), feature("2", -73.8), GeoFeature { zcta5: None, geometry: None }];
        let mut ctx = context(vec![record("1", 10.0, 3.0), record("2", 20.0, 5.0)], features);
        for _ in 0..3 {
            for key in VariableKey::ALL {
                ctx.render(key);
                let doc = ctx.document();
                assert_eq!(doc.elements().filter(|e| e.tag == "path").count(), 3);
                assert_eq!(doc.elements().filter(|e| e.tag == "defs").count(), 1);
                assert_eq!(doc.elements().filter(|e| e.has_class("legend")).count(), 1);
                assert_eq!(ctx.active(), Some(key));
            }
        }
        let empty = ctx.document().elements().nth(2).unwrap();
        assert!(empty.get_attr("d").is_none());
        assert!(empty.get_attr("data-zip").is_none());
    }

    #[test]
    fn hover_at_finds_feature_under_pointer() {
        let mut ctx = context(vec![record("1", 10.0, 3.0)], vec![feature("1", -74.0), feature("2", -73.8)]);
        assert!(ctx.hover_at(0.0, 0.0).is_none());
        ctx.render(VariableKey::SleepDeprivation);
        let (x, y) = ctx.projection().project(-73.95, 40.05);
        let tooltip = ctx.hover_at(x, y).unwrap();
        assert_eq!(tooltip.zipcode, "1");
        assert_eq!(tooltip.neighborhood.as_deref(), Some("Area 1"));
        assert_eq!(tooltip.value, Some(10.0));
        let (x, y) = ctx.projection().project(-73.75, 40.05);
        let tooltip = ctx.hover_at(x, y).unwrap();
        assert_eq!(tooltip.zipcode, "2");
        assert_eq!(tooltip.value, None);
    }
}
