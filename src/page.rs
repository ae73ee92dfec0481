use crate::tooltip::{HIDE, POINTER_OFFSET, SHOW};
use crate::types::VariableKey;

/// Where the page fetches a map after the selector changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSource {
    /// `GET /api/map?variable=<key>` on the serving process.
    Api,
    /// Pre-rendered `map_<key>.svg` files next to the page.
    Files,
}

impl MapSource {
    fn url_expr(&self) -> &'static str {
        match self {
            MapSource::Api => "'/api/map?variable=' + encodeURIComponent(value)",
            MapSource::Files => "'map_' + value + '.svg'",
        }
    }
}

pub fn file_name(variable: VariableKey) -> String {
    format!("map_{}.svg", variable)
}

/// The single interactive page: selector, inline map and floating tooltip.
pub fn render_page(initial_svg: &str, selected: VariableKey, source: MapSource) -> String {
    let options: String = VariableKey::ALL
        .iter()
        .map(|key| {
            let selected = if *key == selected { " selected" } else { "" };
            format!(
                "      <option value=\"{}\"{}>{}</option>\n",
                key,
                selected,
                key.label()
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Sleep deprivation by zip code</title>
  <style>
    .tooltip {{ position: absolute; pointer-events: none; background: #fff; border: 1px solid #999; padding: 4px 6px; font: 12px sans-serif; opacity: 0; }}
  </style>
</head>
<body>
  <label for="variable-select">Variable</label>
  <select id="variable-select">
{options}  </select>
  <div id="map">{svg}</div>
  <div class="tooltip"></div>
  <script>
    const tooltip = document.querySelector('.tooltip');
    const map = document.getElementById('map');
    function fade(opacity, ms) {{
      tooltip.style.transition = 'opacity ' + ms + 'ms';
      tooltip.style.opacity = opacity;
    }}
    map.addEventListener('mouseover', (event) => {{
      const path = event.target.closest('path[data-tooltip]');
      if (!path) return;
      fade({show_opacity}, {show_ms});
      tooltip.innerHTML = path.dataset.tooltip;
      tooltip.style.left = (event.pageX + {dx}) + 'px';
      tooltip.style.top = (event.pageY + {dy}) + 'px';
    }});
    map.addEventListener('mouseout', (event) => {{
      if (!event.target.closest('path[data-tooltip]')) return;
      fade({hide_opacity}, {hide_ms});
    }});
    document.getElementById('variable-select').addEventListener('change', (event) => {{
      const value = event.target.value;
      fetch({url})
        .then((response) => response.text())
        .then((svg) => {{ map.innerHTML = svg; }});
    }});
  </script>
</body>
</html>
"#,
        options = options,
        svg = initial_svg,
        show_opacity = SHOW.opacity,
        show_ms = SHOW.duration_ms,
        hide_opacity = HIDE.opacity,
        hide_ms = HIDE.duration_ms,
        dx = POINTER_OFFSET.0,
        dy = POINTER_OFFSET.1,
        url = source.url_expr(),
    )
}
