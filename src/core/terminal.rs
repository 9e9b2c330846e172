//! Terminal backend seam.

/// Capability flags the renderer branches on. Platform code detects these
/// once; nothing in the render path inspects the OS.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TermCaps {
    /// Supports CSI `@` / CSI `P` (insert/delete columns).
    pub insert_delete_cols: bool,
    /// Autowrap advances the cursor the way the renderer models it. When
    /// false, printing in the last column needs explicit pending-wrap
    /// detection.
    pub consistent_autowrap: bool,
    /// The terminal may render double-width glyphs at a different width than
    /// measured; the prompt column must be reconciled with a cursor probe.
    pub double_width_reconciliation: bool,
}

impl Default for TermCaps {
    fn default() -> Self {
        Self {
            insert_delete_cols: true,
            consistent_autowrap: true,
            double_width_reconciliation: false,
        }
    }
}

/// Sink for rendered bytes plus the queries the render pass needs.
pub trait TerminalBackend {
    fn write(&mut self, data: &str);
    fn flush(&mut self);
    /// `(columns, rows)` of the display surface.
    fn size(&self) -> (u16, u16);
    /// Best-effort `(column, row)` cursor probe; `None` when unsupported.
    fn cursor_position(&mut self) -> Option<(u16, u16)> {
        None
    }
    fn caps(&self) -> TermCaps {
        TermCaps::default()
    }
}
