extern crate alloc;

use alloc::{collections::VecDeque, string::String};
use core::{fmt, ptr::NonNull};

use crate::{AvlTree, Links, TreeNode};

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>>,
    T::Key: fmt::Display,
{
    /// Writes the tree as a Graphviz digraph, one rank per tree level.
    ///
    /// Each node is labelled `key:height`; missing children are drawn as points.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let root = match self.bst.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item<T> {
            Node(NonNull<T>),
            Missing(u32),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut links = String::new();

        while !queue.is_empty() {
            use fmt::Write;

            write!(w, "{{rank=same; ")?;

            for _ in 0..queue.len() {
                let node = match queue.pop_front() {
                    Some(Item::Node(node)) => node,
                    Some(Item::Missing(id)) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                    None => break,
                };

                let (key, node_links) = unsafe { (node.as_ref().key(), T::links(node).as_ref()) };
                let height = node_links.height();
                write!(w, "\"graph{name}-{key}\" [label=\"{key}:{height}\"]; ")?;

                for child in [node_links.left(), node_links.right()] {
                    match child {
                        Some(child) => {
                            let child_key = unsafe { child.as_ref().key() };

                            queue.push_back(Item::Node(child));
                            writeln!(
                                links,
                                "\"graph{name}-{key}\" -> \"graph{name}-{child_key}\";"
                            )?;
                        }
                        None => {
                            queue.push_back(Item::Missing(missing));
                            writeln!(
                                links,
                                "\"graph{name}-{key}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&links)?;

        w.write_str(" }\n}")
    }

    /// Writes the elements in ascending key order as `key:height`, separated by spaces.
    pub fn print<W>(&self, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let mut first = true;

        for node in self.iter() {
            if !first {
                w.write_char(' ')?;
            }
            first = false;

            let height = unsafe { T::links(NonNull::from(node)).as_ref().height() };
            write!(w, "{}:{height}", node.key())?;
        }

        Ok(())
    }
}
