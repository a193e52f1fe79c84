//! plypc: dependency-light reader for PLY point clouds.
//!
//! - Supports `format ascii 1.0` and `format binary_little_endian 1.0`.
//! - Reads the `vertex` element: `x`, `y`, `z` (float32 or float64)
//!   plus optional `red`, `green`, `blue` colors (uint8 scaled to
//!   [0,1], or float32 taken as-is).
//! - Other vertex properties are skipped; elements after `vertex`
//!   (faces etc.) are ignored.
//!
//! File layout:
//!   line 0 : "ply"
//!   line 1 : "format <ascii|binary_little_endian> 1.0"
//!   ..     : "comment ..." | "element <name> <count>" | "property ..."
//!   ..     : "end_header"
//!   body   : element records in declaration order

#[cfg(feature = "mmap")]
use std::fs::File;
use std::io::{self, ErrorKind};
use std::path::Path;

pub const PLY_MAGIC: &str = "ply";

/// A parsed point cloud: positions plus optional aligned colors.
///
/// Invariant: when `colors` is `Some`, it has exactly one RGB triple
/// per point (guaranteed by construction during parsing).
#[derive(Debug, Clone, Default)]
pub struct PlyCloud {
    /// Point positions, one `[x, y, z]` triple per point.
    pub points: Vec<[f32; 3]>,
    /// Per-point RGB colors in [0,1], aligned with `points`.
    pub colors: Option<Vec<[f32; 3]>>,
}

impl PlyCloud {
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Ascii,
    BinaryLittleEndian,
}

/// Fixed-size PLY scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl Scalar {
    fn parse(token: &str) -> io::Result<Self> {
        Ok(match token {
            "char" | "int8" => Scalar::I8,
            "uchar" | "uint8" => Scalar::U8,
            "short" | "int16" => Scalar::I16,
            "ushort" | "uint16" => Scalar::U16,
            "int" | "int32" => Scalar::I32,
            "uint" | "uint32" => Scalar::U32,
            "float" | "float32" => Scalar::F32,
            "double" | "float64" => Scalar::F64,
            other => return Err(bad(&format!("unknown property type '{}'", other))),
        })
    }

    #[inline]
    fn size(self) -> usize {
        match self {
            Scalar::I8 | Scalar::U8 => 1,
            Scalar::I16 | Scalar::U16 => 2,
            Scalar::I32 | Scalar::U32 | Scalar::F32 => 4,
            Scalar::F64 => 8,
        }
    }
}

#[derive(Debug, Clone)]
enum Property {
    Scalar { name: String, ty: Scalar },
    /// Variable-length list (count type + item type). Never read by
    /// this crate, but must be recognized to reject unskippable
    /// layouts cleanly.
    List { name: String },
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    count: usize,
    props: Vec<Property>,
}

impl Element {
    /// Byte size of one record, or None if it contains a list.
    fn fixed_record_size(&self) -> Option<usize> {
        let mut total = 0usize;
        for p in &self.props {
            match p {
                Property::Scalar { ty, .. } => total += ty.size(),
                Property::List { .. } => return None,
            }
        }
        Some(total)
    }
}

#[derive(Debug)]
struct Header {
    format: Format,
    elements: Vec<Element>,
}

#[inline(always)]
fn need(buf: &[u8], want: usize) -> io::Result<()> {
    if buf.len() < want {
        Err(io::Error::new(ErrorKind::UnexpectedEof, "truncated PLY"))
    } else {
        Ok(())
    }
}

#[inline(always)]
fn take<'a>(buf: &mut &'a [u8], n: usize) -> io::Result<&'a [u8]> {
    need(buf, n)?;
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

#[cold]
fn bad(msg: &str) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, msg)
}

/// Reads one little-endian scalar at `offset` inside `record` as f32.
#[inline(always)]
fn scalar_as_f32(record: &[u8], offset: usize, ty: Scalar) -> f32 {
    match ty {
        Scalar::U8 => record[offset] as f32,
        Scalar::I8 => record[offset] as i8 as f32,
        Scalar::I16 => {
            i16::from_le_bytes([record[offset], record[offset + 1]]) as f32
        }
        Scalar::U16 => {
            u16::from_le_bytes([record[offset], record[offset + 1]]) as f32
        }
        Scalar::I32 => i32::from_le_bytes(
            record[offset..offset + 4].try_into().unwrap(),
        ) as f32,
        Scalar::U32 => u32::from_le_bytes(
            record[offset..offset + 4].try_into().unwrap(),
        ) as f32,
        Scalar::F32 => f32::from_le_bytes(
            record[offset..offset + 4].try_into().unwrap(),
        ),
        Scalar::F64 => f64::from_le_bytes(
            record[offset..offset + 8].try_into().unwrap(),
        ) as f32,
    }
}

/// Where to find one attribute triple inside a vertex record.
#[derive(Debug, Clone, Copy)]
struct TripleLayout {
    offsets: [usize; 3],
    tys: [Scalar; 3],
}

impl TripleLayout {
    /// Locates properties `names` within a fixed-size record. Returns
    /// None if any of the three is missing.
    fn locate(props: &[Property], names: [&str; 3]) -> io::Result<Option<Self>> {
        let mut offsets = [usize::MAX; 3];
        let mut tys = [Scalar::F32; 3];
        let mut at = 0usize;

        for p in props {
            match p {
                Property::Scalar { name, ty } => {
                    for (i, wanted) in names.iter().enumerate() {
                        if name == wanted {
                            offsets[i] = at;
                            tys[i] = *ty;
                        }
                    }
                    at += ty.size();
                }
                Property::List { name } => {
                    return Err(bad(&format!(
                        "list property '{}' in vertex element is unsupported",
                        name
                    )));
                }
            }
        }

        if offsets.iter().any(|&o| o == usize::MAX) {
            return Ok(None);
        }

        Ok(Some(Self { offsets, tys }))
    }

    #[inline]
    fn read(&self, record: &[u8]) -> [f32; 3] {
        [
            scalar_as_f32(record, self.offsets[0], self.tys[0]),
            scalar_as_f32(record, self.offsets[1], self.tys[1]),
            scalar_as_f32(record, self.offsets[2], self.tys[2]),
        ]
    }
}

/// Color properties must be uchar (scaled by 1/255) or float (taken
/// as already normalized); other integer widths have no defined
/// scaling and are rejected.
fn check_color_types(tys: [Scalar; 3]) -> io::Result<()> {
    for ty in tys {
        if !matches!(ty, Scalar::U8 | Scalar::F32 | Scalar::F64) {
            return Err(bad("color properties must be uchar or float"));
        }
    }
    Ok(())
}

/// Scales a raw color triple into [0,1].
#[inline]
fn normalize_color(raw: [f32; 3], tys: [Scalar; 3]) -> [f32; 3] {
    let mut out = raw;
    for i in 0..3 {
        if tys[i] == Scalar::U8 {
            out[i] /= 255.0;
        }
    }
    out
}

fn parse_header(text: &str) -> io::Result<Header> {
    let mut lines = text.lines().map(str::trim_end);

    if lines.next() != Some(PLY_MAGIC) {
        return Err(bad("bad PLY magic"));
    }

    let mut format = None;
    let mut elements: Vec<Element> = Vec::new();

    for line in lines {
        let mut tokens = line.split_ascii_whitespace();
        match tokens.next() {
            None | Some("comment") | Some("obj_info") => {}
            Some("format") => {
                format = Some(match tokens.next() {
                    Some("ascii") => Format::Ascii,
                    Some("binary_little_endian") => Format::BinaryLittleEndian,
                    Some(other) => {
                        return Err(bad(&format!("unsupported PLY format '{}'", other)))
                    }
                    None => return Err(bad("missing PLY format")),
                });
            }
            Some("element") => {
                let name = tokens.next().ok_or_else(|| bad("element without name"))?;
                let count: usize = tokens
                    .next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| bad("element without count"))?;
                elements.push(Element {
                    name: name.to_string(),
                    count,
                    props: Vec::new(),
                });
            }
            Some("property") => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| bad("property before any element"))?;
                let ty_token = tokens.next().ok_or_else(|| bad("property without type"))?;

                if ty_token == "list" {
                    // list <count_ty> <item_ty> <name>
                    let _count_ty = tokens.next().ok_or_else(|| bad("list without count type"))?;
                    let _item_ty = tokens.next().ok_or_else(|| bad("list without item type"))?;
                    let name = tokens.next().ok_or_else(|| bad("list without name"))?;
                    element.props.push(Property::List {
                        name: name.to_string(),
                    });
                } else {
                    let ty = Scalar::parse(ty_token)?;
                    let name = tokens.next().ok_or_else(|| bad("property without name"))?;
                    element.props.push(Property::Scalar {
                        name: name.to_string(),
                        ty,
                    });
                }
            }
            Some(other) => {
                return Err(bad(&format!("unknown header keyword '{}'", other)));
            }
        }
    }

    let format = format.ok_or_else(|| bad("missing PLY format line"))?;

    Ok(Header { format, elements })
}

fn parse_binary_vertices(
    body: &mut &[u8],
    element: &Element,
) -> io::Result<PlyCloud> {
    let record_size = element
        .fixed_record_size()
        .ok_or_else(|| bad("list property in vertex element is unsupported"))?;

    let pos = TripleLayout::locate(&element.props, ["x", "y", "z"])?
        .ok_or_else(|| bad("vertex element is missing x/y/z"))?;
    let col = TripleLayout::locate(&element.props, ["red", "green", "blue"])?;
    if let Some(layout) = col {
        check_color_types(layout.tys)?;
    }

    let total = element
        .count
        .checked_mul(record_size)
        .ok_or_else(|| bad("vertex block size overflow"))?;
    let block = take(body, total)?;

    // Fast path: tightly packed [f32 x, f32 y, f32 z] records with no
    // extra properties; reinterpret the whole block at once.
    #[cfg(target_endian = "little")]
    if col.is_none()
        && record_size == 12
        && pos.offsets == [0, 4, 8]
        && pos.tys == [Scalar::F32; 3]
    {
        if let Ok(cast) = bytemuck::try_cast_slice::<u8, [f32; 3]>(block) {
            return Ok(PlyCloud {
                points: cast.to_vec(),
                colors: None,
            });
        }
    }

    let mut points = Vec::with_capacity(element.count);
    let mut colors = col.map(|_| Vec::with_capacity(element.count));

    for record in block.chunks_exact(record_size) {
        points.push(pos.read(record));
        if let (Some(cs), Some(layout)) = (colors.as_mut(), col) {
            cs.push(normalize_color(layout.read(record), layout.tys));
        }
    }

    Ok(PlyCloud { points, colors })
}

fn parse_ascii_vertices<'a, I>(
    lines: &mut I,
    element: &Element,
) -> io::Result<PlyCloud>
where
    I: Iterator<Item = &'a str>,
{
    // Token index of each named property within a record line.
    let mut pos_idx = [usize::MAX; 3];
    let mut col_idx = [usize::MAX; 3];
    let mut col_tys = [Scalar::F32; 3];

    for (i, p) in element.props.iter().enumerate() {
        match p {
            Property::Scalar { name, ty } => {
                match name.as_str() {
                    "x" => pos_idx[0] = i,
                    "y" => pos_idx[1] = i,
                    "z" => pos_idx[2] = i,
                    "red" => (col_idx[0], col_tys[0]) = (i, *ty),
                    "green" => (col_idx[1], col_tys[1]) = (i, *ty),
                    "blue" => (col_idx[2], col_tys[2]) = (i, *ty),
                    _ => {}
                }
            }
            Property::List { name } => {
                return Err(bad(&format!(
                    "list property '{}' in vertex element is unsupported",
                    name
                )));
            }
        }
    }

    if pos_idx.iter().any(|&i| i == usize::MAX) {
        return Err(bad("vertex element is missing x/y/z"));
    }
    let has_color = col_idx.iter().all(|&i| i != usize::MAX);
    if has_color {
        check_color_types(col_tys)?;
    }

    let mut points = Vec::with_capacity(element.count);
    let mut colors = has_color.then(|| Vec::with_capacity(element.count));

    for _ in 0..element.count {
        let line = lines
            .next()
            .ok_or_else(|| io::Error::new(ErrorKind::UnexpectedEof, "truncated PLY"))?;

        let mut values = Vec::with_capacity(element.props.len());
        for token in line.split_ascii_whitespace() {
            values.push(
                token
                    .parse::<f32>()
                    .map_err(|_| bad("non-numeric vertex value"))?,
            );
        }
        if values.len() < element.props.len() {
            return Err(bad("short vertex record"));
        }

        points.push([values[pos_idx[0]], values[pos_idx[1]], values[pos_idx[2]]]);

        if let Some(cs) = colors.as_mut() {
            let raw = [values[col_idx[0]], values[col_idx[1]], values[col_idx[2]]];
            cs.push(normalize_color(raw, col_tys));
        }
    }

    Ok(PlyCloud { points, colors })
}

/// Parse PLY from a contiguous byte slice. This is the single source
/// of truth for parsing.
pub fn parse_ply_bytes(bytes: &[u8]) -> io::Result<PlyCloud> {
    // Locate the end of the textual header.
    const END: &[u8] = b"end_header";
    let end_at = bytes
        .windows(END.len())
        .position(|w| w == END)
        .ok_or_else(|| bad("missing end_header"))?;
    let body_at = match bytes[end_at + END.len()..].iter().position(|&b| b == b'\n') {
        Some(nl) => end_at + END.len() + nl + 1,
        None => bytes.len(),
    };

    let header_text = std::str::from_utf8(&bytes[..end_at])
        .map_err(|_| bad("non-UTF-8 PLY header"))?;
    let header = parse_header(header_text)?;

    match header.format {
        Format::BinaryLittleEndian => {
            let mut body = &bytes[body_at..];
            for element in &header.elements {
                if element.name == "vertex" {
                    return parse_binary_vertices(&mut body, element);
                }
                // Skip a preceding element; possible only for
                // fixed-size records.
                let record_size = element.fixed_record_size().ok_or_else(|| {
                    bad("list property before vertex element is unsupported")
                })?;
                let total = element
                    .count
                    .checked_mul(record_size)
                    .ok_or_else(|| bad("element block size overflow"))?;
                take(&mut body, total)?;
            }
            Err(bad("no vertex element"))
        }
        Format::Ascii => {
            let body_text = std::str::from_utf8(&bytes[body_at..])
                .map_err(|_| bad("non-UTF-8 ascii PLY body"))?;
            let mut lines = body_text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty());

            for element in &header.elements {
                if element.name == "vertex" {
                    return parse_ascii_vertices(&mut lines, element);
                }
                // One line per record in ascii PLY.
                for _ in 0..element.count {
                    lines.next().ok_or_else(|| {
                        io::Error::new(ErrorKind::UnexpectedEof, "truncated PLY")
                    })?;
                }
            }
            Err(bad("no vertex element"))
        }
    }
}

/// Fast path: prefer mmap; fall back to a single read.
#[cfg(feature = "mmap")]
pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<PlyCloud> {
    let file = File::open(path)?;
    let map = unsafe { memmap2::MmapOptions::new().map(&file)? };
    parse_ply_bytes(&map)
}

#[cfg(not(feature = "mmap"))]
pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<PlyCloud> {
    let bytes = std::fs::read(path)?;
    parse_ply_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASCII_COLORED: &str = "\
ply
format ascii 1.0
comment four reference points
element vertex 4
property float x
property float y
property float z
property uchar red
property uchar green
property uchar blue
end_header
0 0 0 255 0 0
1 0 0 0 255 0
0 1 0 0 0 255
0 0 1 255 255 255
";

    #[test]
    fn ascii_with_uchar_colors() {
        let cloud = parse_ply_bytes(ASCII_COLORED.as_bytes()).unwrap();
        assert_eq!(cloud.len(), 4);
        assert_eq!(
            cloud.points,
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ]
        );
        assert_eq!(
            cloud.colors.unwrap(),
            vec![
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
                [1.0, 1.0, 1.0],
            ]
        );
    }

    #[test]
    fn ascii_without_colors() {
        let text = "\
ply
format ascii 1.0
element vertex 2
property float x
property float y
property float z
end_header
1 2 3
4 5 6
";
        let cloud = parse_ply_bytes(text.as_bytes()).unwrap();
        assert_eq!(cloud.points, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert!(cloud.colors.is_none());
    }

    #[test]
    fn ascii_float_colors_taken_as_is() {
        let text = "\
ply
format ascii 1.0
element vertex 1
property float x
property float y
property float z
property float red
property float green
property float blue
end_header
0 0 0 0.5 1.0 0.25
";
        let cloud = parse_ply_bytes(text.as_bytes()).unwrap();
        assert_eq!(cloud.colors.unwrap(), vec![[0.5, 1.0, 0.25]]);
    }

    #[test]
    fn ascii_truncated_body() {
        let text = "\
ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
end_header
1 2 3
";
        let err = parse_ply_bytes(text.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn empty_vertex_element() {
        let text = "\
ply
format ascii 1.0
element vertex 0
property float x
property float y
property float z
end_header
";
        let cloud = parse_ply_bytes(text.as_bytes()).unwrap();
        assert!(cloud.is_empty());
    }

    fn binary_file(points: &[[f32; 3]], colors: Option<&[[u8; 3]]>) -> Vec<u8> {
        let mut header = String::from("ply\nformat binary_little_endian 1.0\n");
        header.push_str(&format!("element vertex {}\n", points.len()));
        header.push_str("property float x\nproperty float y\nproperty float z\n");
        if colors.is_some() {
            header.push_str(
                "property uchar red\nproperty uchar green\nproperty uchar blue\n",
            );
        }
        header.push_str("end_header\n");

        let mut out = header.into_bytes();
        for (i, p) in points.iter().enumerate() {
            for c in p {
                out.extend_from_slice(&c.to_le_bytes());
            }
            if let Some(cs) = colors {
                out.extend_from_slice(&cs[i]);
            }
        }
        out
    }

    #[test]
    fn binary_little_endian_with_colors() {
        let bytes = binary_file(
            &[[1.0, 2.0, 3.0], [-4.0, 5.5, 0.0]],
            Some(&[[255, 0, 0], [0, 0, 255]]),
        );
        let cloud = parse_ply_bytes(&bytes).unwrap();
        assert_eq!(cloud.points, vec![[1.0, 2.0, 3.0], [-4.0, 5.5, 0.0]]);
        assert_eq!(
            cloud.colors.unwrap(),
            vec![[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]
        );
    }

    #[test]
    fn binary_positions_only_fast_path() {
        let bytes = binary_file(&[[0.25, -0.5, 8.0]], None);
        let cloud = parse_ply_bytes(&bytes).unwrap();
        assert_eq!(cloud.points, vec![[0.25, -0.5, 8.0]]);
        assert!(cloud.colors.is_none());
    }

    #[test]
    fn binary_truncated_block() {
        let mut bytes = binary_file(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]], None);
        bytes.truncate(bytes.len() - 4);
        let err = parse_ply_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn rejects_wide_integer_colors() {
        // A ushort red of 65535 would scale to 257.0 under the uchar
        // rule; wide integer colors are refused outright.
        let text = "\
ply
format ascii 1.0
element vertex 1
property float x
property float y
property float z
property ushort red
property ushort green
property ushort blue
end_header
0 0 0 65535 0 0
";
        let err = parse_ply_bytes(text.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn rejects_bad_magic() {
        let err = parse_ply_bytes(b"poly\nformat ascii 1.0\nend_header\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn rejects_big_endian() {
        let text = "\
ply
format binary_big_endian 1.0
element vertex 0
property float x
property float y
property float z
end_header
";
        assert!(parse_ply_bytes(text.as_bytes()).is_err());
    }

    #[test]
    fn skips_unrelated_leading_element() {
        let text = "\
ply
format ascii 1.0
element camera 1
property float cx
property float cy
element vertex 1
property float x
property float y
property float z
end_header
0.5 0.5
7 8 9
";
        let cloud = parse_ply_bytes(text.as_bytes()).unwrap();
        assert_eq!(cloud.points, vec![[7.0, 8.0, 9.0]]);
    }

    #[test]
    fn skips_extra_vertex_properties() {
        let text = "\
ply
format ascii 1.0
element vertex 1
property float x
property float y
property float z
property float nx
property float ny
property float nz
end_header
1 2 3 0 0 1
";
        let cloud = parse_ply_bytes(text.as_bytes()).unwrap();
        assert_eq!(cloud.points, vec![[1.0, 2.0, 3.0]]);
    }

    #[test]
    fn double_positions_narrowed() {
        let mut out = b"ply\nformat binary_little_endian 1.0\n\
element vertex 1\n\
property double x\nproperty double y\nproperty double z\n\
end_header\n"
            .to_vec();
        for v in [1.5f64, -2.0, 0.125] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        let cloud = parse_ply_bytes(&out).unwrap();
        assert_eq!(cloud.points, vec![[1.5, -2.0, 0.125]]);
    }
}
