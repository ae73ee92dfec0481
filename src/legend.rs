use crate::config::CanvasConfig;
use crate::scale::{extent, format_fixed, quantile, ColorScale, LinearScale};
use crate::svg::Element;
use crate::types::VariableKey;

pub const LEGEND_WIDTH: f64 = 20.0;
pub const GRADIENT_STOPS: usize = 10;
pub const AXIS_TICKS: usize = 5;
const TITLE_TOP: f64 = -25.0;
const TITLE_LINE_HEIGHT: f64 = 15.0;
const TICK_SIZE: f64 = 6.0;
const TICK_PADDING: f64 = 3.0;
// half-pixel offset for crisp 1px axis lines
const AXIS_OFFSET: f64 = 0.5;

pub fn gradient_id(variable: VariableKey) -> String {
    format!("legend-gradient-{}", variable)
}

/// Replaces any existing legend on `svg` with one for `variable`.
///
/// The gradient stops follow the quantiles of `values` while the axis is a
/// plain linear scale over their extent, so the labels are evenly spaced even
/// when the colors are not.
pub fn render_legend(
    svg: &mut Element,
    canvas: &CanvasConfig,
    variable: VariableKey,
    values: &[f64],
    scale: &ColorScale,
) {
    svg.remove_where(|e| e.has_class("legend"));
    svg.remove_where(|e| e.tag == "defs");

    let legend_height = canvas.height / 2.0;
    let id = gradient_id(variable);

    let mut gradient = Element::new("linearGradient")
        .attr("id", &id)
        .attr("x1", "0%")
        .attr("y1", "100%")
        .attr("x2", "0%")
        .attr("y2", "0%");
    for i in 0..=GRADIENT_STOPS {
        let offset = i as f64 / GRADIENT_STOPS as f64;
        let mut stop = Element::new("stop").attr("offset", format!("{}%", i * 100 / GRADIENT_STOPS));
        if let Some(q) = quantile(values, offset) {
            stop.set_attr("stop-color", scale.color(q));
        }
        gradient = gradient.child(stop);
    }
    svg.append(Element::new("defs").child(gradient));

    let mut legend = Element::new("g").attr("class", "legend").attr(
        "transform",
        format!("translate({},{})", canvas.width + 30.0, canvas.height / 4.0),
    );

    legend.append(
        Element::new("rect")
            .attr("width", LEGEND_WIDTH)
            .attr("height", legend_height)
            .attr("style", format!("fill: url(#{});", id)),
    );

    for (i, word) in variable.title_words().into_iter().enumerate() {
        legend.append(
            Element::new("text")
                .attr("class", "legend-title")
                .attr("x", -5)
                .attr("y", TITLE_TOP + i as f64 * TITLE_LINE_HEIGHT)
                .attr("style", "text-anchor: start; font-size: 12px;")
                .text(word),
        );
    }

    let axis_scale = LinearScale {
        domain: extent(values).unwrap_or((0.0, 0.0)),
        range: (legend_height, 0.0),
    };
    legend.append(axis(&axis_scale, values.is_empty()));

    svg.append(legend);
}

fn axis(scale: &LinearScale, empty: bool) -> Element {
    let mut axis = Element::new("g")
        .attr("class", "legend-axis")
        .attr("transform", format!("translate({}, 0)", LEGEND_WIDTH))
        .attr("fill", "none")
        .attr("font-size", 10)
        .attr("font-family", "sans-serif")
        .attr("text-anchor", "start");

    let (r0, r1) = scale.range;
    axis.append(
        Element::new("path")
            .attr("class", "domain")
            .attr("stroke", "currentColor")
            .attr(
                "d",
                format!(
                    "M{},{}H{}V{}H{}",
                    TICK_SIZE,
                    r0 + AXIS_OFFSET,
                    AXIS_OFFSET,
                    r1 + AXIS_OFFSET,
                    TICK_SIZE
                ),
            ),
    );

    if empty {
        return axis;
    }

    for tick in scale.ticks(AXIS_TICKS) {
        axis.append(
            Element::new("g")
                .attr("class", "tick")
                .attr("opacity", 1)
                .attr("transform", format!("translate(0,{})", scale.map(tick) + AXIS_OFFSET))
                .child(
                    Element::new("line")
                        .attr("stroke", "currentColor")
                        .attr("x2", TICK_SIZE),
                )
                .child(
                    Element::new("text")
                        .attr("fill", "currentColor")
                        .attr("x", TICK_SIZE + TICK_PADDING)
                        .attr("dy", "0.32em")
                        .text(format_fixed(tick, 1)),
                ),
        );
    }
    axis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::Rgb;

    fn legend_for(values: &[f64]) -> Element {
        let mut svg = Element::new("svg");
        let scale = ColorScale::activate(VariableKey::SleepDeprivation, values);
        render_legend(
            &mut svg,
            &CanvasConfig::default(),
            VariableKey::SleepDeprivation,
            values,
            &scale,
        );
        svg
    }

    #[test]
    fn stops_follow_quantiles() {
        let values = [1.0, 2.0, 3.0, 10.0, 50.0];
        let svg = legend_for(&values);
        let scale = ColorScale::activate(VariableKey::SleepDeprivation, &values);
        let stops = svg.select_all(&|e| e.tag == "stop");
        assert_eq!(stops.len(), 11);
        for (i, stop) in stops.iter().enumerate() {
            let expected: Rgb = scale.color(quantile(&values, i as f64 / 10.0).unwrap());
            assert_eq!(stop.get_attr("stop-color"), Some(expected.to_string().as_str()));
            assert_eq!(stop.get_attr("offset"), Some(format!("{}%", i * 10).as_str()));
        }
    }

    #[test]
    fn axis_labels_use_plain_extent() {
        let svg = legend_for(&[0.0, 1.0, 2.0, 3.0, 100.0]);
        let labels: Vec<String> = svg
            .select_all(&|e| e.has_class("tick"))
            .iter()
            .map(|t| t.text_content())
            .collect();
        assert_eq!(labels, vec!["0.0", "20.0", "40.0", "60.0", "80.0", "100.0"]);
        let top = svg.select_all(&|e| e.has_class("tick")).last().unwrap().get_attr("transform").map(str::to_string);
        assert_eq!(top.as_deref(), Some("translate(0,0.5)"));
    }

    #[test]
    fn tick_labels_round_exact_ties_up() {
        let svg = legend_for(&[0.0, 0.3]);
        let labels: Vec<String> = svg
            .select_all(&|e| e.has_class("tick"))
            .iter()
            .map(|t| t.text_content())
            .collect();
        // ticks every 0.05; 0.25 is an exact tie
        assert_eq!(labels, vec!["0.0", "0.1", "0.1", "0.1", "0.2", "0.3", "0.3"]);
    }

    #[test]
    fn title_is_one_word_per_line() {
        let svg = legend_for(&[1.0]);
        let titles = svg.select_all(&|e| e.has_class("legend-title"));
        assert_eq!(titles.len(), 2);
        assert_eq!(titles[0].text_content(), "SLEEP");
        assert_eq!(titles[0].get_attr("y"), Some("-25"));
        assert_eq!(titles[1].text_content(), "DEPRIVATION");
        assert_eq!(titles[1].get_attr("y"), Some("-10"));
    }

    #[test]
    fn redraw_replaces_previous_legend() {
        let mut svg = legend_for(&[1.0, 2.0]);
        let scale = ColorScale::activate(VariableKey::MedianIncome, &[5.0]);
        render_legend(&mut svg, &CanvasConfig::default(), VariableKey::MedianIncome, &[5.0], &scale);
        assert_eq!(svg.elements().filter(|e| e.tag == "defs").count(), 1);
        assert_eq!(svg.elements().filter(|e| e.has_class("legend")).count(), 1);
        let gradient = svg.select_all(&|e| e.tag == "linearGradient");
        assert_eq!(gradient[0].get_attr("id"), Some("legend-gradient-median_income"));
    }

    #[test]
    fn empty_values_draw_no_ticks_or_colors() {
        let svg = legend_for(&[]);
        assert!(svg.select_all(&|e| e.has_class("tick")).is_empty());
        assert!(svg
            .select_all(&|e| e.tag == "stop")
            .iter()
            .all(|s| s.get_attr("stop-color").is_none()));
    }
}
