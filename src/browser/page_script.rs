//! In-page observer that reports page events back over a CDP runtime binding.
//!
//! Every payload is a JSON-encoded [`crate::core::types::PageSignal`].

/// Name of the `Runtime.addBinding` function the observer calls.
pub const SIGNAL_BINDING: &str = "__autowatchSignal";

/// Minimum spacing between two mutation signals.
pub const MUTATION_THROTTLE_MS: u64 = 150;

/// Observer source, safe to evaluate more than once per document.
pub fn observer_script() -> String {
    format!(
        r#"(() => {{
    if (window.__autowatchObserverInstalled) return;
    window.__autowatchObserverInstalled = true;

    const post = (signal) => {{
        try {{
            if (typeof window.{binding} === 'function') window.{binding}(JSON.stringify(signal));
        }} catch (e) {{}}
    }};

    let lastUrl = location.href;
    const checkUrl = () => {{
        if (location.href !== lastUrl) {{
            lastUrl = location.href;
            post({{ type: 'url_change', url: lastUrl }});
        }}
    }};

    let mutationTimer = null;
    let lastMutation = 0;
    const onMutation = () => {{
        checkUrl();
        const now = Date.now();
        const wait = {throttle} - (now - lastMutation);
        if (wait <= 0) {{
            lastMutation = now;
            post({{ type: 'mutation' }});
        }} else if (!mutationTimer) {{
            mutationTimer = setTimeout(() => {{
                mutationTimer = null;
                lastMutation = Date.now();
                post({{ type: 'mutation' }});
            }}, wait);
        }}
    }};

    const observe = () => {{
        const root = document.body || document.documentElement;
        if (!root) return false;
        new MutationObserver((mutations) => {{
            if (mutations.some(m => m.type === 'childList')) onMutation();
        }}).observe(root, {{ childList: true, subtree: true }});
        return true;
    }};
    if (!observe()) document.addEventListener('DOMContentLoaded', observe, {{ once: true }});

    document.addEventListener('visibilitychange', () => {{
        post({{ type: 'visibility', visible: !document.hidden }});
    }});

    const onFullscreen = () => {{
        const active = !!(document.fullscreenElement || document.webkitFullscreenElement
            || document.mozFullScreenElement || document.msFullscreenElement);
        post({{ type: 'fullscreen', active }});
    }};
    ['fullscreenchange', 'webkitfullscreenchange', 'mozfullscreenchange', 'MSFullscreenChange']
        .forEach(name => document.addEventListener(name, onFullscreen));

    // Media events do not bubble; catch them on the way down.
    document.addEventListener('playing', (e) => {{
        if (e.target && e.target.tagName === 'VIDEO') post({{ type: 'playing' }});
    }}, true);
    document.addEventListener('ratechange', (e) => {{
        if (e.target && e.target.tagName === 'VIDEO') post({{ type: 'rate_change', rate: e.target.playbackRate }});
    }}, true);

    window.addEventListener('popstate', checkUrl);
    window.addEventListener('hashchange', checkUrl);
    window.addEventListener('beforeunload', () => post({{ type: 'before_unload' }}));

    if (document.readyState === 'complete') {{
        post({{ type: 'load', url: location.href }});
    }} else {{
        window.addEventListener('load', () => post({{ type: 'load', url: location.href }}), {{ once: true }});
    }}
}})();"#,
        binding = SIGNAL_BINDING,
        throttle = MUTATION_THROTTLE_MS,
    )
}
