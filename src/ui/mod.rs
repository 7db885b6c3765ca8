//! 展示层：当前只有无界面的命令行模式。

pub mod noui;
