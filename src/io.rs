use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;
use itertools::Itertools;
use crate::error::{FasError, Result};
use crate::graph::{CsrGraph, Edge, Weight};
use crate::solution::{self, Solution};

/// Textual graph formats understood by `read_graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    /// `n m`, then `m` lines `u v w`.
    W,
    /// `n m`, then `m` lines `u v`.
    U,
    /// `p <name> n m`, then `m` lines `a u v w t` with 1-based ids.
    Dw,
    /// Like `Dw` with every weight set to 1.
    Du,
    /// SNAP edge list with a `# Nodes: n Edges: m` header line.
    Su,
    /// `u v` pairs up to the end of the input.
    Lu,
    /// `n`, then an `n x n` weight matrix.
    Lo,
}

impl FromStr for GraphFormat {
    type Err = FasError;

    fn from_str(s: &str) -> Result<GraphFormat> {
        match s {
            "W" => Ok(GraphFormat::W),
            "U" => Ok(GraphFormat::U),
            "DW" => Ok(GraphFormat::Dw),
            "DU" => Ok(GraphFormat::Du),
            "SU" => Ok(GraphFormat::Su),
            "LU" => Ok(GraphFormat::Lu),
            "LO" => Ok(GraphFormat::Lo),
            _ => Err(FasError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let tag = match self {
            GraphFormat::W => "W",
            GraphFormat::U => "U",
            GraphFormat::Dw => "DW",
            GraphFormat::Du => "DU",
            GraphFormat::Su => "SU",
            GraphFormat::Lu => "LU",
            GraphFormat::Lo => "LO",
        };
        f.write_str(tag)
    }
}

/// Whitespace separated tokens tagged with their 1-based line number.
struct Tokens<I> {
    inner: I,
    line: usize,
}

impl<'a, I: Iterator<Item = (usize, &'a str)>> Tokens<I> {
    fn raw(&mut self, what: &str) -> Result<&'a str> {
        match self.inner.next() {
            Some((line, tok)) => {
                self.line = line;
                Ok(tok)
            }
            None => Err(FasError::Parse { line: self.line, message: format!("unexpected end of input, expected {}", what) }),
        }
    }

    fn next<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let tok = self.raw(what)?;
        tok.parse()
            .map_err(|_| FasError::Parse { line: self.line, message: format!("expected {}, found `{}`", what, tok) })
    }

    /// A 1-based vertex id, returned 0-based.
    fn one_based(&mut self) -> Result<usize> {
        match self.next::<usize>("vertex id")? {
            0 => Err(FasError::Parse { line: self.line, message: "vertex ids start at 1".to_string() }),
            v => Ok(v - 1),
        }
    }
}

fn tokens(text: &str) -> Tokens<impl Iterator<Item = (usize, &str)>> {
    let inner = text.lines().enumerate().flat_map(|(i, l)| l.split_whitespace().map(move |t| (i + 1, t)));
    Tokens { inner, line: 1 }
}

/// Parses a graph. Returns the vertex count, grown to cover every endpoint,
/// and the edges in input order.
pub fn read_graph<R: Read>(mut reader: R, format: GraphFormat) -> Result<(usize, Vec<Edge>)> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_graph(&text, format)
}

pub fn read_graph_file<P: AsRef<Path>>(path: P, format: GraphFormat) -> Result<(usize, Vec<Edge>)> {
    read_graph(BufReader::new(File::open(path)?), format)
}

fn parse_graph(text: &str, format: GraphFormat) -> Result<(usize, Vec<Edge>)> {
    let mut edges = Vec::new();
    let mut n: usize;
    match format {
        GraphFormat::W | GraphFormat::U => {
            let mut t = tokens(text);
            n = t.next("vertex count")?;
            let m: usize = t.next("edge count")?;
            for _ in 0..m {
                let u = t.next("vertex id")?;
                let v = t.next("vertex id")?;
                let w = match format {
                    GraphFormat::W => t.next::<Weight>("weight")?,
                    _ => 1,
                };
                if w > 0 {
                    edges.push(Edge::new(u, v, w));
                }
            }
        }
        GraphFormat::Dw | GraphFormat::Du => {
            let mut t = tokens(text);
            t.raw("`p`")?;
            t.raw("graph name")?;
            n = t.next("vertex count")?;
            let m: usize = t.next("edge count")?;
            for _ in 0..m {
                t.raw("`a`")?;
                let u = t.one_based()?;
                let v = t.one_based()?;
                let w: Weight = t.next("weight")?;
                t.next::<Weight>("delay")?;
                let w = if format == GraphFormat::Dw { w } else { 1 };
                edges.push(Edge::new(u, v, w));
            }
        }
        GraphFormat::Su => {
            n = 0;
            let mut expected = None;
            for line in text.lines().filter(|l| l.starts_with('#')) {
                let words = line.split_whitespace().collect_vec();
                if let Some(i) = words.iter().position(|&w| w == "Nodes:") {
                    n = words.get(i + 1).and_then(|w| w.parse().ok()).unwrap_or(0);
                }
                if let Some(i) = words.iter().position(|&w| w == "Edges:") {
                    expected = words.get(i + 1).and_then(|w| w.parse::<usize>().ok());
                }
            }
            let body = text.lines().enumerate().filter(|(_, l)| !l.starts_with('#'));
            let mut t = Tokens { inner: body.flat_map(|(i, l)| l.split_whitespace().map(move |s| (i + 1, s))), line: 1 };
            let mut read = 0;
            while expected.map_or(true, |m| read < m) {
                let Ok(u) = t.raw("vertex id") else {
                    break;
                };
                let u: usize = u
                    .parse()
                    .map_err(|_| FasError::Parse { line: t.line, message: format!("expected vertex id, found `{}`", u) })?;
                let v = t.next("vertex id")?;
                edges.push(Edge::new(u, v, 1));
                read += 1;
            }
            if let Some(m) = expected.filter(|&m| read < m) {
                return Err(FasError::Parse { line: t.line, message: format!("expected {} edges, found {}", m, read) });
            }
        }
        GraphFormat::Lu => {
            n = 0;
            let mut t = tokens(text);
            while let Ok(u) = t.raw("vertex id") {
                let u: usize = u
                    .parse()
                    .map_err(|_| FasError::Parse { line: t.line, message: format!("expected vertex id, found `{}`", u) })?;
                let v = t.next("vertex id")?;
                edges.push(Edge::new(u, v, 1));
            }
        }
        GraphFormat::Lo => {
            let mut t = tokens(text);
            n = t.next("vertex count")?;
            for i in 0..n {
                for j in 0..n {
                    let w: Weight = t.next("weight")?;
                    if w > 0 {
                        edges.push(Edge::new(i, j, w));
                    }
                }
            }
        }
    }
    for e in &edges {
        n = n.max(e.src.max(e.dst) + 1);
    }
    Ok((n, edges))
}

/// Writes `g` in format `W`.
pub fn write_graph_w<W: Write>(g: &CsrGraph, writer: W) -> Result<()> {
    let mut out = BufWriter::new(writer);
    writeln!(out, "{} {}", g.num_vertices(), g.num_edges())?;
    for e in g.edges() {
        writeln!(out, "{} {} {}", e.src, e.dst, e.weight)?;
    }
    out.flush()?;
    Ok(())
}

/// Writes `g` in format `U`; weights are lost.
pub fn write_graph_u<W: Write>(g: &CsrGraph, writer: W) -> Result<()> {
    let mut out = BufWriter::new(writer);
    writeln!(out, "{} {}", g.num_vertices(), g.num_edges())?;
    for e in g.edges() {
        writeln!(out, "{} {}", e.src, e.dst)?;
    }
    out.flush()?;
    Ok(())
}

/// Writes the positions on one line, separated by spaces.
pub fn write_solution<W: Write>(rank: &[usize], writer: W) -> Result<()> {
    let mut out = BufWriter::new(writer);
    writeln!(out, "{}", rank.iter().join(" "))?;
    out.flush()?;
    Ok(())
}

/// Reads whitespace separated positions; they must form a permutation.
pub fn read_solution<R: Read>(mut reader: R) -> Result<Solution> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let mut t = tokens(&text);
    let mut rank = Vec::new();
    while let Ok(tok) = t.raw("position") {
        let r: usize = tok
            .parse()
            .map_err(|_| FasError::Parse { line: t.line, message: format!("expected position, found `{}`", tok) })?;
        rank.push(r);
    }
    if !solution::is_permutation(&rank) {
        return Err(FasError::NotAPermutation(rank.len()));
    }
    Ok(rank)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str, format: &str) -> Result<(usize, Vec<Edge>)> {
        read_graph(text.as_bytes(), format.parse()?)
    }

    #[test]
    fn weighted_and_unweighted() {
        let (n, es) = parse("3 3\n0 1 4\n1 2 0\n2 0 7\n", "W").unwrap();
        assert_eq!(n, 3);
        assert_eq!(es, vec![Edge::new(0, 1, 4), Edge::new(2, 0, 7)]);
        let (n, es) = parse("2 2\n0 1\n1 4\n", "U").unwrap();
        assert_eq!(n, 5);
        assert_eq!(es[1], Edge::new(1, 4, 1));
    }

    #[test]
    fn dimacs_ids_are_one_based() {
        let text = "p s27 3 2\na 1 2 5 0\na 3 1 2 1\n";
        let (n, es) = parse(text, "DW").unwrap();
        assert_eq!(n, 3);
        assert_eq!(es, vec![Edge::new(0, 1, 5), Edge::new(2, 0, 2)]);
        let (_, es) = parse(text, "DU").unwrap();
        assert!(es.iter().all(|e| e.weight == 1));
        assert!(matches!(parse("p x 1 1\na 0 1 1 1\n", "DW"), Err(FasError::Parse { line: 2, .. })));
    }

    #[test]
    fn snap_header_is_read() {
        let text = "# Directed graph\n# Test\n# Nodes: 4 Edges: 2\n# FromNodeId\tToNodeId\n0\t1\n5\t2\n";
        let (n, es) = parse(text, "SU").unwrap();
        assert_eq!(n, 6);
        assert_eq!(es, vec![Edge::new(0, 1, 1), Edge::new(5, 2, 1)]);
    }

    #[test]
    fn lists_and_matrices() {
        let (n, es) = parse("0 3\n3 1\n", "LU").unwrap();
        assert_eq!(n, 4);
        assert_eq!(es.len(), 2);
        let (n, es) = parse("2\n0 3\n1 0\n", "LO").unwrap();
        assert_eq!(n, 2);
        assert_eq!(es, vec![Edge::new(0, 1, 3), Edge::new(1, 0, 1)]);
    }

    #[test]
    fn malformed_input_reports_the_line() {
        assert!(matches!(parse("2 2\n0 1 1\n1 x 1\n", "W"), Err(FasError::Parse { line: 3, .. })));
        assert!(matches!(parse("2 2\n0 1 1\n", "W"), Err(FasError::Parse { line: 2, .. })));
        assert!(matches!(parse("0 1\n", "Q"), Err(FasError::UnknownFormat(_))));
    }

    #[test]
    fn solutions() {
        let mut buf = Vec::new();
        write_solution(&[2, 0, 1], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf.clone()).unwrap(), "2 0 1\n");
        assert_eq!(read_solution(buf.as_slice()).unwrap(), vec![2, 0, 1]);
        assert!(matches!(read_solution("0 0 1".as_bytes()), Err(FasError::NotAPermutation(3))));
        assert!(matches!(read_solution("0 a".as_bytes()), Err(FasError::Parse { line: 1, .. })));
    }

    #[test]
    fn writers_match_the_readers() {
        let g = CsrGraph::new(3, vec![Edge::new(0, 1, 2), Edge::new(2, 1, 1)]);
        let mut buf = Vec::new();
        write_graph_w(&g, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "3 2\n0 1 2\n2 1 1\n");
        let mut buf = Vec::new();
        write_graph_u(&g, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "3 2\n0 1\n2 1\n");
    }
}
