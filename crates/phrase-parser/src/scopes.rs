//! Lexical scope observation.
//!
//! Scopes are a by-product of the tree, not part of it: this pass walks a
//! finished `Program` and records, per function-level scope, the variable
//! names observed as binding targets (assignments, `global`, `static`,
//! foreach bindings, catch variables, parameters, closure captures) and the
//! function names declared there. Function, method, and closure bodies open
//! child scopes; plain blocks share their enclosing scope.

use std::collections::BTreeSet;

use phrase_ast::*;

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub variables: BTreeSet<String>,
    pub functions: BTreeSet<String>,
    pub children: Vec<Scope>,
}

pub fn analyze(program: &Program) -> Scope {
    let mut root = Scope::default();
    for stmt in &program.stmts {
        collect_stmt(stmt, &mut root);
    }
    root
}

fn collect_stmts(stmts: &[Stmt], scope: &mut Scope) {
    for stmt in stmts {
        collect_stmt(stmt, scope);
    }
}

fn collect_stmt(stmt: &Stmt, scope: &mut Scope) {
    match &stmt.kind {
        StmtKind::Expression(e) | StmtKind::Throw(e) => collect_expr(e, scope),
        StmtKind::Echo(exprs) => {
            for e in exprs {
                collect_expr(e, scope);
            }
        }
        StmtKind::Return(value) | StmtKind::Break(value) | StmtKind::Continue(value) => {
            if let Some(e) = value {
                collect_expr(e, scope);
            }
        }
        StmtKind::Block(stmts) => collect_stmts(stmts, scope),
        StmtKind::If(s) => {
            collect_expr(&s.condition, scope);
            collect_stmt(&s.then_branch, scope);
            for branch in &s.elseif_branches {
                collect_expr(&branch.condition, scope);
                collect_stmt(&branch.body, scope);
            }
            if let Some(e) = &s.else_branch {
                collect_stmt(e, scope);
            }
        }
        StmtKind::While(s) => {
            collect_expr(&s.condition, scope);
            collect_stmt(&s.body, scope);
        }
        StmtKind::DoWhile(s) => {
            collect_stmt(&s.body, scope);
            collect_expr(&s.condition, scope);
        }
        StmtKind::For(s) => {
            for e in s.init.iter().chain(&s.condition).chain(&s.update) {
                collect_expr(e, scope);
            }
            collect_stmt(&s.body, scope);
        }
        StmtKind::Foreach(s) => {
            collect_expr(&s.expr, scope);
            if let Some(key) = &s.key {
                bind_target(key, scope);
            }
            bind_target(&s.value, scope);
            collect_stmt(&s.body, scope);
        }
        StmtKind::Switch(s) => {
            collect_expr(&s.expr, scope);
            for case in &s.cases {
                if let Some(v) = &case.value {
                    collect_expr(v, scope);
                }
                collect_stmts(&case.body, scope);
            }
        }
        StmtKind::TryCatch(s) => {
            collect_stmts(&s.body, scope);
            for catch in &s.catches {
                if let Some(var) = &catch.var {
                    scope.variables.insert(var.clone());
                }
                collect_stmts(&catch.body, scope);
            }
            if let Some(finally) = &s.finally {
                collect_stmts(finally, scope);
            }
        }
        StmtKind::Function(decl) => {
            scope.functions.insert(decl.name.clone());
            let child = function_scope(&decl.params, &[], &decl.body);
            scope.children.push(child);
        }
        StmtKind::Class(decl) => collect_members(&decl.members, scope),
        StmtKind::Interface(decl) => collect_members(&decl.members, scope),
        StmtKind::Trait(decl) => collect_members(&decl.members, scope),
        StmtKind::Namespace(decl) => {
            if let Some(body) = &decl.body {
                collect_stmts(body, scope);
            }
        }
        StmtKind::Const(items) => {
            for item in items {
                collect_expr(&item.value, scope);
            }
        }
        StmtKind::Global(vars) => {
            for e in vars {
                if let ExprKind::Variable(name) = &e.kind {
                    scope.variables.insert(name.clone());
                }
            }
        }
        StmtKind::StaticVar(vars) => {
            for var in vars {
                scope.variables.insert(var.name.clone());
                if let Some(default) = &var.default {
                    collect_expr(default, scope);
                }
            }
        }
        StmtKind::Declare(_, body) => {
            if let Some(body) = body {
                collect_stmt(body, scope);
            }
        }
        StmtKind::Use(_) | StmtKind::Nop | StmtKind::Error => {}
    }
}

fn collect_members(members: &[ClassMember], scope: &mut Scope) {
    for member in members {
        match &member.kind {
            ClassMemberKind::Method(method) => {
                if let Some(body) = &method.body {
                    let child = function_scope(&method.params, &[], body);
                    scope.children.push(child);
                }
            }
            ClassMemberKind::Property(prop) => {
                if let Some(default) = &prop.default {
                    collect_expr(default, scope);
                }
            }
            ClassMemberKind::Const(decl) => collect_expr(&decl.value, scope),
            ClassMemberKind::TraitUse(_) => {}
        }
    }
}

fn function_scope(params: &[Param], uses: &[ClosureUse], body: &[Stmt]) -> Scope {
    let mut child = Scope::default();
    for param in params {
        child.variables.insert(param.name.clone());
    }
    for capture in uses {
        child.variables.insert(capture.name.clone());
    }
    collect_stmts(body, &mut child);
    child
}

fn collect_expr(expr: &Expr, scope: &mut Scope) {
    match &expr.kind {
        ExprKind::Assign(a) => {
            bind_target(&a.target, scope);
            collect_expr(&a.target, scope);
            collect_expr(&a.value, scope);
        }
        ExprKind::Closure(c) => {
            let child = function_scope(&c.params, &c.uses, &c.body);
            scope.children.push(child);
        }
        ExprKind::Binary(b) => {
            collect_expr(&b.left, scope);
            collect_expr(&b.right, scope);
        }
        ExprKind::UnaryPrefix(u) => collect_expr(&u.operand, scope),
        ExprKind::UnaryPostfix(u) => collect_expr(&u.operand, scope),
        ExprKind::Ternary(t) => {
            collect_expr(&t.condition, scope);
            if let Some(then_expr) = &t.then_expr {
                collect_expr(then_expr, scope);
            }
            collect_expr(&t.else_expr, scope);
        }
        ExprKind::NullCoalesce(n) => {
            collect_expr(&n.left, scope);
            collect_expr(&n.right, scope);
        }
        ExprKind::FunctionCall(c) => {
            collect_expr(&c.callee, scope);
            for arg in &c.args {
                collect_expr(arg, scope);
            }
        }
        ExprKind::MethodCall(c) => {
            collect_expr(&c.object, scope);
            collect_expr(&c.method, scope);
            for arg in &c.args {
                collect_expr(arg, scope);
            }
        }
        ExprKind::PropertyAccess(p) => {
            collect_expr(&p.object, scope);
            collect_expr(&p.property, scope);
        }
        ExprKind::StaticPropertyAccess(s) | ExprKind::ClassConstAccess(s) => {
            collect_expr(&s.class, scope);
        }
        ExprKind::StaticMethodCall(c) => {
            collect_expr(&c.class, scope);
            for arg in &c.args {
                collect_expr(arg, scope);
            }
        }
        ExprKind::Array(elements) | ExprKind::List(elements) => {
            for element in elements {
                if let Some(key) = &element.key {
                    collect_expr(key, scope);
                }
                collect_expr(&element.value, scope);
            }
        }
        ExprKind::ArrayAccess(a) => {
            collect_expr(&a.array, scope);
            collect_expr(&a.index, scope);
        }
        ExprKind::ArrayAppend(inner) => collect_expr(inner, scope),
        ExprKind::New(n) => {
            collect_expr(&n.class, scope);
            for arg in &n.args {
                collect_expr(arg, scope);
            }
        }
        ExprKind::AnonymousClass(decl) => collect_members(&decl.members, scope),
        ExprKind::Include(_, inner)
        | ExprKind::Print(inner)
        | ExprKind::Clone(inner)
        | ExprKind::Cast(_, inner)
        | ExprKind::ErrorSuppress(inner)
        | ExprKind::Parenthesized(inner)
        | ExprKind::VariableVariable(inner) => collect_expr(inner, scope),
        ExprKind::Exit(value) => {
            if let Some(e) = value {
                collect_expr(e, scope);
            }
        }
        ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::String(_)
        | ExprKind::Bool(_)
        | ExprKind::Null
        | ExprKind::Variable(_)
        | ExprKind::Identifier(_)
        | ExprKind::ShellCommand(_)
        | ExprKind::Error => {}
    }
}

/// Insert the variable names bound by an assignment target.
fn bind_target(expr: &Expr, scope: &mut Scope) {
    match &expr.kind {
        ExprKind::Variable(name) => {
            scope.variables.insert(name.clone());
        }
        ExprKind::List(elements) | ExprKind::Array(elements) => {
            for element in elements {
                bind_target(&element.value, scope);
            }
        }
        // `$a[0] = …` and `$a[] = …` observe the base variable
        ExprKind::ArrayAccess(a) => bind_target(&a.array, scope),
        ExprKind::ArrayAppend(inner) => bind_target(inner, scope),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scopes_of(source: &str) -> Scope {
        let result = crate::parse(source);
        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
        analyze(&result.program)
    }

    #[test]
    fn test_top_level_assignments() {
        let scope = scopes_of("<?php $a = 1; $b = $a + 2;");
        assert!(scope.variables.contains("a"));
        assert!(scope.variables.contains("b"));
        assert!(scope.children.is_empty());
    }

    #[test]
    fn test_function_opens_child_scope() {
        let scope = scopes_of("<?php $x = 1; function f($y) { $z = $y; }");
        assert!(scope.variables.contains("x"));
        assert!(!scope.variables.contains("y"));
        assert!(scope.functions.contains("f"));
        assert_eq!(scope.children.len(), 1);
        let inner = &scope.children[0];
        assert!(inner.variables.contains("y"));
        assert!(inner.variables.contains("z"));
    }

    #[test]
    fn test_closure_params_and_captures() {
        let scope = scopes_of("<?php $f = function ($a) use (&$b) { $c = $a; };");
        assert!(scope.variables.contains("f"));
        assert_eq!(scope.children.len(), 1);
        let inner = &scope.children[0];
        assert!(inner.variables.contains("a"));
        assert!(inner.variables.contains("b"));
        assert!(inner.variables.contains("c"));
    }

    #[test]
    fn test_foreach_and_catch_bindings() {
        let scope = scopes_of(
            "<?php foreach ($rows as $k => $v) { } try { } catch (Exception $e) { }",
        );
        assert!(scope.variables.contains("k"));
        assert!(scope.variables.contains("v"));
        assert!(scope.variables.contains("e"));
    }

    #[test]
    fn test_global_and_static_declarations() {
        let scope = scopes_of("<?php function f() { global $g; static $s = 0; }");
        let inner = &scope.children[0];
        assert!(inner.variables.contains("g"));
        assert!(inner.variables.contains("s"));
    }

    #[test]
    fn test_list_destructuring_binds_all() {
        let scope = scopes_of("<?php list($a, $b) = $pair;");
        assert!(scope.variables.contains("a"));
        assert!(scope.variables.contains("b"));
    }

    #[test]
    fn test_method_bodies_open_scopes() {
        let scope = scopes_of("<?php class C { public function m($p) { $q = $p; } }");
        assert_eq!(scope.children.len(), 1);
        assert!(scope.children[0].variables.contains("p"));
        assert!(scope.children[0].variables.contains("q"));
    }
}
