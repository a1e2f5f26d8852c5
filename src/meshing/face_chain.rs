/// Face-chain encoding of triangle topology.
///
/// A face array is a list of chains closed by a `0` word. A chain starts
/// with its triangle count `n`, followed by `n + 2` elements. An element is
/// the vertex index, then the texcoord index if the mesh has texcoords,
/// then the normal index if it has normals. The top bit of the vertex word
/// is the direction bit.
///
/// The first three elements form the first triangle `(V1, V2, V3)`. Each
/// further element `V4` yields the next triangle: `(V1, V3, V4)` when its
/// direction bit is clear, `(V3, V2, V4)` when it is set. Strips and fans
/// thus cost one element per triangle instead of three.
///
/// The layout is bit-exact: meshes baked elsewhere decode identically.
use crate::error::MeshError;

pub const DIRECTION_BIT: u16 = 0x8000;
pub const INDEX_MASK: u16 = 0x7FFF;

/// Optional words present in every element.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FaceLayout {
    pub texcoords: bool,
    pub normals: bool,
}

impl FaceLayout {
    pub const fn words_per_element(self) -> usize {
        1 + self.texcoords as usize + self.normals as usize
    }
}

/// One decoded element. Indices absent from the layout read as 0.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FaceVertex {
    pub vertex: u16,
    pub texcoord: u16,
    pub normal: u16,
}

impl FaceVertex {
    pub const fn new(vertex: u16, texcoord: u16, normal: u16) -> Self {
        FaceVertex {
            vertex,
            texcoord,
            normal,
        }
    }

    /// Element without texcoord or normal.
    pub const fn vertex(vertex: u16) -> Self {
        FaceVertex::new(vertex, 0, 0)
    }
}

/// Which edge of the current triangle the next one is hinged on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Hinge {
    /// Direction bit clear: next triangle is `(V1, V3, V4)`.
    FirstThird,
    /// Direction bit set: next triangle is `(V3, V2, V4)`.
    ThirdSecond,
}

impl Hinge {
    #[inline]
    pub fn from_word(word: u16) -> Self {
        if word & DIRECTION_BIT != 0 {
            Hinge::ThirdSecond
        } else {
            Hinge::FirstThird
        }
    }

    /// Move the current triangle's slots to the next triangle. `new` ends
    /// up in the last slot. Works for any per-vertex payload so callers can
    /// reuse work done on the two kept vertices.
    #[inline]
    pub fn advance<T>(self, tri: &mut [T; 3], new: T) {
        match self {
            Hinge::FirstThird => tri.swap(1, 2),
            Hinge::ThirdSecond => tri.swap(0, 2),
        }
        tri[2] = new;
    }
}

/// What the reader found next in the face array.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FaceEvent {
    /// Opening triangle of a chain.
    Start([FaceVertex; 3]),
    /// One more element for the current chain.
    Next { element: FaceVertex, hinge: Hinge },
}

/// Streaming decoder over a face array.
///
/// Decoding never panics: a truncated array ends the stream and is
/// reported by [`truncated_at`](Self::truncated_at). Running off the end
/// of the slice between chains counts as a regular terminator.
#[derive(Clone, Debug)]
pub struct FaceChainReader<'f> {
    faces: &'f [u16],
    layout: FaceLayout,
    pos: usize,
    /// Triangles still to come in the current chain.
    remaining: u32,
    finished: bool,
    truncated: Option<usize>,
    bad_direction: Option<usize>,
}

impl<'f> FaceChainReader<'f> {
    pub fn new(faces: &'f [u16], layout: FaceLayout) -> Self {
        FaceChainReader {
            faces,
            layout,
            pos: 0,
            remaining: 0,
            finished: false,
            truncated: None,
            bad_direction: None,
        }
    }

    /// Word offset of the next unread word.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Word offset of the element that could not be read, if any.
    pub fn truncated_at(&self) -> Option<usize> {
        self.truncated
    }

    /// First opening element found with its direction bit set. Such a bit
    /// is ignored by the decoder.
    pub fn direction_bit_on_opening(&self) -> Option<usize> {
        self.bad_direction
    }

    /// Read one element; `None` when the array is too short.
    #[inline]
    fn element(&mut self) -> Option<(u16, FaceVertex)> {
        let n = self.layout.words_per_element();
        let words = self.faces.get(self.pos..self.pos + n)?;
        let raw = words[0];
        let mut e = FaceVertex::vertex(raw & INDEX_MASK);
        if self.layout.texcoords {
            e.texcoord = words[1];
        }
        if self.layout.normals {
            e.normal = words[n - 1];
        }
        self.pos += n;
        Some((raw, e))
    }

    fn truncate(&mut self) -> Option<FaceEvent> {
        self.truncated = Some(self.pos);
        self.finished = true;
        None
    }

    /// Convert into an iterator over whole triangles.
    pub fn triangles(self) -> FaceTriangles<'f> {
        FaceTriangles {
            reader: self,
            current: [FaceVertex::default(); 3],
        }
    }
}

impl Iterator for FaceChainReader<'_> {
    type Item = FaceEvent;

    fn next(&mut self) -> Option<FaceEvent> {
        if self.finished {
            return None;
        }
        if self.remaining > 0 {
            let Some((raw, element)) = self.element() else {
                return self.truncate();
            };
            self.remaining -= 1;
            return Some(FaceEvent::Next {
                element,
                hinge: Hinge::from_word(raw),
            });
        }
        let n = match self.faces.get(self.pos) {
            None | Some(0) => {
                self.finished = true;
                return None;
            }
            Some(&n) => n,
        };
        let start = self.pos;
        self.pos += 1;
        let mut tri = [FaceVertex::default(); 3];
        for slot in &mut tri {
            let Some((raw, e)) = self.element() else {
                return self.truncate();
            };
            if raw & DIRECTION_BIT != 0 && self.bad_direction.is_none() {
                self.bad_direction = Some(start);
            }
            *slot = e;
        }
        self.remaining = n as u32 - 1;
        Some(FaceEvent::Start(tri))
    }
}

/// Triangles of a face array, in drawing order.
#[derive(Clone, Debug)]
pub struct FaceTriangles<'f> {
    reader: FaceChainReader<'f>,
    current: [FaceVertex; 3],
}

impl FaceTriangles<'_> {
    pub fn truncated_at(&self) -> Option<usize> {
        self.reader.truncated_at()
    }
}

impl Iterator for FaceTriangles<'_> {
    type Item = [FaceVertex; 3];

    fn next(&mut self) -> Option<[FaceVertex; 3]> {
        match self.reader.next()? {
            FaceEvent::Start(tri) => self.current = tri,
            FaceEvent::Next { element, hinge } => hinge.advance(&mut self.current, element),
        }
        Some(self.current)
    }
}

/// Encoder producing face arrays the reader decodes back exactly.
#[derive(Clone, Debug)]
pub struct FaceChainBuilder {
    words: Vec<u16>,
    layout: FaceLayout,
    /// Offset of the open chain's header.
    open: Option<usize>,
}

impl FaceChainBuilder {
    pub fn new(layout: FaceLayout) -> Self {
        FaceChainBuilder {
            words: Vec::new(),
            layout,
            open: None,
        }
    }

    fn push_element(&mut self, e: FaceVertex, direction: bool) -> Result<(), MeshError> {
        if e.vertex > INDEX_MASK {
            return Err(MeshError::IndexOutOfRange {
                what: "vertex",
                index: e.vertex as usize,
                len: INDEX_MASK as usize + 1,
                at: self.words.len(),
            });
        }
        self.words.push(if direction { e.vertex | DIRECTION_BIT } else { e.vertex });
        if self.layout.texcoords {
            self.words.push(e.texcoord);
        }
        if self.layout.normals {
            self.words.push(e.normal);
        }
        Ok(())
    }

    /// Open a new chain with its first triangle.
    pub fn begin(&mut self, a: FaceVertex, b: FaceVertex, c: FaceVertex) -> Result<(), MeshError> {
        let header = self.words.len();
        self.words.push(1);
        for e in [a, b, c] {
            if let Err(err) = self.push_element(e, false) {
                self.words.truncate(header);
                return Err(err);
            }
        }
        self.open = Some(header);
        Ok(())
    }

    /// Append one triangle to the open chain.
    pub fn advance(&mut self, hinge: Hinge, e: FaceVertex) -> Result<(), MeshError> {
        let Some(header) = self.open else {
            return Err(MeshError::ChainTooShort { len: 0 });
        };
        if self.words[header] == u16::MAX {
            // Chain full: restart from the current triangle.
            return Err(MeshError::TooManyElements {
                what: "chain triangle",
                count: u16::MAX as usize + 1,
                limit: u16::MAX as usize,
            });
        }
        self.push_element(e, hinge == Hinge::ThirdSecond)?;
        self.words[header] += 1;
        Ok(())
    }

    /// A chain holding a single triangle.
    pub fn triangle(&mut self, a: FaceVertex, b: FaceVertex, c: FaceVertex) -> Result<(), MeshError> {
        self.begin(a, b, c)?;
        self.open = None;
        Ok(())
    }

    /// Encode a triangle strip `s0 s1 s2 s3 ...` (triangles `s0 s1 s2`,
    /// `s2 s1 s3`, `s2 s3 s4`, ... alternating winding).
    pub fn strip(&mut self, elements: &[FaceVertex]) -> Result<(), MeshError> {
        let [a, b, c, rest @ ..] = elements else {
            return Err(MeshError::ChainTooShort { len: elements.len() });
        };
        self.begin(*a, *b, *c)?;
        for (i, e) in rest.iter().enumerate() {
            let hinge = if i % 2 == 0 { Hinge::ThirdSecond } else { Hinge::FirstThird };
            self.advance(hinge, *e)?;
        }
        self.open = None;
        Ok(())
    }

    /// Close the array with the `0` terminator.
    pub fn finish(mut self) -> Vec<u16> {
        self.words.push(0);
        self.words
    }
}
