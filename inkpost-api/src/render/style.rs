use inkpost_common::config::SiteColors;

const BASE_RULES: &str = r"
*{box-sizing:border-box}
body{margin:0 auto;max-width:760px;padding:1.5rem 1rem;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;line-height:1.6;color:var(--text);background:var(--background)}
a{color:var(--accent);text-decoration:none}
a:hover{color:var(--accent-hover);text-decoration:underline}
img{max-width:100%;height:auto}
.site-header{display:flex;flex-wrap:wrap;align-items:baseline;justify-content:space-between;gap:1rem;padding-bottom:1rem;margin-bottom:1.5rem;border-bottom:2px solid var(--background-accent)}
.site-name{font-size:1.4rem;font-weight:700;color:var(--text)}
.site-header nav{display:flex;gap:1rem;align-items:baseline}
.viewer{color:var(--text-light)}
.post-summary{padding:1rem;margin-bottom:1rem;background:var(--background-accent);border-radius:6px}
.post-summary h2{margin:0 0 .25rem}
.post-meta{font-size:.9rem;color:var(--text-light)}
.post-content code{background:var(--code);padding:.1rem .3rem;border-radius:3px}
.post-content pre{background:var(--preformatted);padding:.75rem 1rem;overflow-x:auto;border-radius:6px}
.post-content pre code{background:none;padding:0}
.post-content blockquote{margin:1rem 0;padding-left:1rem;border-left:3px solid var(--accent);color:var(--text-light)}
.button,button{display:inline-block;padding:.45rem 1rem;border:none;border-radius:6px;background:var(--accent);color:var(--accent-text);font:inherit;cursor:pointer}
.button:hover,button:hover{background:var(--accent-hover);color:var(--accent-text);text-decoration:none}
button:disabled{background:var(--disabled);cursor:default}
form{display:flex;flex-direction:column;gap:.75rem}
label{display:flex;flex-direction:column;gap:.25rem;color:var(--text-light)}
input,textarea{font:inherit;padding:.4rem .6rem;border:1px solid var(--background-accent);border-radius:4px;background:var(--background);color:var(--text)}
textarea{min-height:16rem;font-family:ui-monospace,Menlo,monospace}
.site-footer{margin-top:3rem;padding-top:1rem;border-top:2px solid var(--background-accent);color:var(--text-light);font-size:.9rem;text-align:center}
.badges{display:flex;flex-wrap:wrap;justify-content:center;gap:.5rem}
.badges img{height:31px}
";

/// The site stylesheet, with the configured palette as CSS custom properties.
#[must_use]
pub fn stylesheet(colors: &SiteColors) -> String {
    let properties = [
        ("background", &colors.background),
        ("background-accent", &colors.background_accent),
        ("text", &colors.text),
        ("text-light", &colors.text_light),
        ("accent", &colors.accent),
        ("accent-hover", &colors.accent_hover),
        ("accent-text", &colors.accent_text),
        ("code", &colors.code),
        ("preformatted", &colors.preformatted),
        ("disabled", &colors.disabled),
    ];

    let mut css = String::from(":root {\n");
    for (name, value) in properties {
        css.push_str("  --");
        css.push_str(name);
        css.push_str(": ");
        css.push_str(&sanitize_css_value(value));
        css.push_str(";\n");
    }
    css.push('}');
    css.push_str(BASE_RULES);
    css
}

/// Keeps a configured color from closing the declaration or the rule.
fn sanitize_css_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>'))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::render::{stylesheet, tests::config};

    #[test]
    fn palette_becomes_custom_properties() {
        let css = stylesheet(&config().site_colors);

        assert!(css.starts_with(":root {\n  --background: #fafafa;\n"));
        assert!(css.contains("  --accent: #9900cc;\n"));
        assert!(css.contains("  --disabled: #999999;\n}"));
        assert!(css.contains("color:var(--accent)"));
    }

    #[test]
    fn values_cannot_break_out() {
        let mut colors = config().site_colors;
        colors.text = "red;}body{display:none".to_owned();

        let css = stylesheet(&colors);
        assert!(css.contains("  --text: redbodydisplay:none;\n"));
    }
}
