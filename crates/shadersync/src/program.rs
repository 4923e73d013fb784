use crate::kind::ShaderKind;

#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    #[error("program has no {0} shader attached")]
    MissingStage(ShaderKind),
    #[error("attached {0} shader did not compile")]
    Uncompiled(ShaderKind),
    #[error("failed to link program: {0}")]
    Link(String),
}

/// A linkable program made of one vertex and one fragment shader.
///
/// Implementations keep an [`ActiveShaders`] table: `create_shader` compiles the
/// source, attaches the result, and replaces whatever was recorded for that kind.
/// Compile failures are not reported here; they show up when `link` fails.
pub trait ShaderProgram {
    type Handle;

    fn create_shader(&mut self, kind: ShaderKind, source: &str) -> Self::Handle;

    /// Detaches the shader currently attached for `kind`, if any.
    fn detach_shader(&mut self, kind: ShaderKind) -> Option<Self::Handle>;

    fn link(&mut self) -> Result<(), ProgramError>;
}

/// Compiles and attaches a vertex shader.
pub fn vert<P: ShaderProgram + ?Sized>(program: &mut P, source: &str) -> P::Handle {
    program.create_shader(ShaderKind::Vertex, source)
}

/// Compiles and attaches a fragment shader.
pub fn frag<P: ShaderProgram + ?Sized>(program: &mut P, source: &str) -> P::Handle {
    program.create_shader(ShaderKind::Fragment, source)
}

/// At most one attached shader per [`ShaderKind`].
#[derive(Debug, Clone)]
pub struct ActiveShaders<H> {
    vertex: Option<H>,
    fragment: Option<H>,
}

impl<H> ActiveShaders<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ShaderKind) -> Option<&H> {
        self.slot(kind).as_ref()
    }

    /// Records `shader` for `kind`, returning the entry it replaced.
    pub fn insert(&mut self, kind: ShaderKind, shader: H) -> Option<H> {
        self.slot_mut(kind).replace(shader)
    }

    pub fn remove(&mut self, kind: ShaderKind) -> Option<H> {
        self.slot_mut(kind).take()
    }

    pub fn contains(&self, kind: ShaderKind) -> bool {
        self.slot(kind).is_some()
    }

    pub fn len(&self) -> usize {
        ShaderKind::ALL
            .iter()
            .filter(|kind| self.contains(**kind))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, kind: ShaderKind) -> &Option<H> {
        match kind {
            ShaderKind::Vertex => &self.vertex,
            ShaderKind::Fragment => &self.fragment,
        }
    }

    fn slot_mut(&mut self, kind: ShaderKind) -> &mut Option<H> {
        match kind {
            ShaderKind::Vertex => &mut self.vertex,
            ShaderKind::Fragment => &mut self.fragment,
        }
    }
}

impl<H> Default for ActiveShaders<H> {
    fn default() -> Self {
        Self {
            vertex: None,
            fragment: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_previous_entry_for_kind() {
        let mut table = ActiveShaders::new();
        assert!(table.insert(ShaderKind::Fragment, 1).is_none());
        assert_eq!(table.insert(ShaderKind::Fragment, 2), Some(1));
        assert_eq!(table.get(ShaderKind::Fragment), Some(&2));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn kinds_are_tracked_independently() {
        let mut table = ActiveShaders::new();
        table.insert(ShaderKind::Vertex, "vs");
        table.insert(ShaderKind::Fragment, "fs");
        assert_eq!(table.remove(ShaderKind::Fragment), Some("fs"));
        assert!(table.contains(ShaderKind::Vertex));
        assert!(!table.contains(ShaderKind::Fragment));
        assert_eq!(table.remove(ShaderKind::Fragment), None);
    }

    #[test]
    fn new_table_is_empty() {
        let table: ActiveShaders<u32> = ActiveShaders::default();
        assert!(table.is_empty());
    }
}
