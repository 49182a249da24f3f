//! Skeleton files written by `forge new` and `forge generate`.
//!
//! Skeletons are static text with `{{key}}` placeholders filled from a
//! [`ScaffoldRecord`]. They are written once and then owned by the user;
//! sync never touches them.

use serde::{Deserialize, Serialize};

/// Values available to every skeleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaffoldRecord {
    /// Project (or workspace) name as typed by the user
    pub name: String,
    /// Go package identifier derived from the name
    pub package: String,
    /// Go module path of the project
    pub module: String,
    pub workspace: String,
    pub go_version: String,
    pub node_version: String,
    pub bazel_version: String,
}

/// What a generator produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blueprint {
    Workspace,
    GoService,
    GoLibrary,
    NestService,
    AngularApp,
    ReactApp,
}

impl Blueprint {
    /// `(template id, output path)` pairs. Output paths may contain
    /// placeholders.
    pub fn files(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Blueprint::Workspace => &[
                ("workspace/gitignore", ".gitignore"),
                ("workspace/bazelversion", ".bazelversion"),
                ("workspace/bazelrc", ".bazelrc"),
                ("workspace/go_work", "go.work"),
            ],
            Blueprint::GoService => &[
                ("go/go_mod", "go.mod"),
                ("go/service_main", "cmd/server/main.go"),
                ("go/service_handler", "internal/handler/handler.go"),
                ("go/service_handler_test", "internal/handler/handler_test.go"),
            ],
            Blueprint::GoLibrary => &[
                ("go/go_mod", "go.mod"),
                ("go/library", "{{package}}.go"),
                ("go/library_test", "{{package}}_test.go"),
            ],
            Blueprint::NestService => &[
                ("nest/package_json", "package.json"),
                ("nest/tsconfig", "tsconfig.json"),
                ("nest/main", "src/main.ts"),
                ("nest/app_module", "src/app.module.ts"),
            ],
            Blueprint::AngularApp => &[
                ("angular/package_json", "package.json"),
                ("angular/angular_json", "angular.json"),
                ("web/tsconfig", "tsconfig.json"),
                ("angular/index_html", "src/index.html"),
                ("angular/main", "src/main.ts"),
                ("angular/app_component", "src/app/app.component.ts"),
            ],
            Blueprint::ReactApp => &[
                ("react/package_json", "package.json"),
                ("react/vite_config", "vite.config.ts"),
                ("web/tsconfig", "tsconfig.json"),
                ("react/index_html", "index.html"),
                ("react/main", "src/main.tsx"),
                ("react/app", "src/App.tsx"),
            ],
        }
    }
}

/// Fill `{{key}}` placeholders from the string fields of `data`.
pub fn substitute(text: &str, data: &serde_json::Value) -> String {
    let mut out = text.to_string();
    if let Some(map) = data.as_object() {
        for (key, value) in map {
            if let Some(value) = value.as_str() {
                out = out.replace(&format!("{{{{{}}}}}", key), value);
            }
        }
    }
    out
}

/// Raw skeleton text for a template id.
pub fn source(id: &str) -> Option<&'static str> {
    let text = match id {
        "workspace/gitignore" => GITIGNORE,
        "workspace/bazelversion" => "{{bazel_version}}\n",
        "workspace/bazelrc" => BAZELRC,
        "workspace/go_work" => "go {{go_version}}\n",
        "go/go_mod" => "module {{module}}\n\ngo {{go_version}}\n",
        "go/service_main" => GO_SERVICE_MAIN,
        "go/service_handler" => GO_SERVICE_HANDLER,
        "go/service_handler_test" => GO_SERVICE_HANDLER_TEST,
        "go/library" => GO_LIBRARY,
        "go/library_test" => GO_LIBRARY_TEST,
        "nest/package_json" => NEST_PACKAGE_JSON,
        "nest/tsconfig" => NEST_TSCONFIG,
        "nest/main" => NEST_MAIN,
        "nest/app_module" => NEST_APP_MODULE,
        "angular/package_json" => ANGULAR_PACKAGE_JSON,
        "angular/angular_json" => ANGULAR_JSON,
        "angular/index_html" => ANGULAR_INDEX_HTML,
        "angular/main" => ANGULAR_MAIN,
        "angular/app_component" => ANGULAR_APP_COMPONENT,
        "web/tsconfig" => WEB_TSCONFIG,
        "react/package_json" => REACT_PACKAGE_JSON,
        "react/vite_config" => REACT_VITE_CONFIG,
        "react/index_html" => REACT_INDEX_HTML,
        "react/main" => REACT_MAIN,
        "react/app" => REACT_APP,
        _ => return None,
    };
    Some(text)
}

const GITIGNORE: &str = r#"# Bazel
/bazel-*

# Go
*.test
*.out

# Node
node_modules/
dist/

# forge
.forge/cache/

# Editors
.idea/
.vscode/
*.swp
"#;

const BAZELRC: &str = r#"common --enable_bzlmod
build --incompatible_strict_action_env
test --test_output=errors
"#;

const GO_SERVICE_MAIN: &str = r#"package main

import (
	"log"
	"net/http"
	"os"

	"{{module}}/internal/handler"
)

func main() {
	addr := os.Getenv("ADDR")
	if addr == "" {
		addr = ":8080"
	}

	log.Printf("{{name}} listening on %s", addr)
	if err := http.ListenAndServe(addr, handler.New()); err != nil {
		log.Fatal(err)
	}
}
"#;

const GO_SERVICE_HANDLER: &str = r#"package handler

import (
	"encoding/json"
	"net/http"
)

// New returns the HTTP handler for {{name}}.
func New() http.Handler {
	mux := http.NewServeMux()
	mux.HandleFunc("/healthz", func(w http.ResponseWriter, r *http.Request) {
		w.Header().Set("Content-Type", "application/json")
		_ = json.NewEncoder(w).Encode(map[string]string{"status": "ok"})
	})
	return mux
}
"#;

const GO_SERVICE_HANDLER_TEST: &str = r#"package handler

import (
	"net/http"
	"net/http/httptest"
	"testing"
)

func TestHealthz(t *testing.T) {
	rec := httptest.NewRecorder()
	New().ServeHTTP(rec, httptest.NewRequest(http.MethodGet, "/healthz", nil))
	if rec.Code != http.StatusOK {
		t.Fatalf("status = %d, want %d", rec.Code, http.StatusOK)
	}
}
"#;

const GO_LIBRARY: &str = r#"// Package {{package}} is part of the {{workspace}} workspace.
package {{package}}

// Name returns the library name.
func Name() string {
	return "{{name}}"
}
"#;

const GO_LIBRARY_TEST: &str = r#"package {{package}}

import "testing"

func TestName(t *testing.T) {
	if got := Name(); got != "{{name}}" {
		t.Fatalf("Name() = %q", got)
	}
}
"#;

const NEST_PACKAGE_JSON: &str = r#"{
  "name": "{{name}}",
  "version": "0.0.0",
  "private": true,
  "scripts": {
    "build": "nest build",
    "start": "nest start"
  },
  "dependencies": {
    "@nestjs/common": "^10.3.0",
    "@nestjs/core": "^10.3.0",
    "@nestjs/platform-express": "^10.3.0",
    "reflect-metadata": "^0.2.1",
    "rxjs": "^7.8.1"
  },
  "devDependencies": {
    "@nestjs/cli": "^10.3.0",
    "typescript": "^5.4.0"
  }
}
"#;

const NEST_TSCONFIG: &str = r#"{
  "compilerOptions": {
    "module": "commonjs",
    "target": "ES2021",
    "outDir": "./dist",
    "experimentalDecorators": true,
    "emitDecoratorMetadata": true,
    "strict": true
  }
}
"#;

const NEST_MAIN: &str = r#"import { NestFactory } from '@nestjs/core';
import { AppModule } from './app.module';

async function bootstrap() {
  const app = await NestFactory.create(AppModule);
  await app.listen(process.env.PORT ?? 3000);
}
bootstrap();
"#;

const NEST_APP_MODULE: &str = r#"import { Module } from '@nestjs/common';

@Module({})
export class AppModule {}
"#;

const ANGULAR_PACKAGE_JSON: &str = r#"{
  "name": "{{name}}",
  "version": "0.0.0",
  "private": true,
  "scripts": {
    "build": "ng build",
    "start": "ng serve"
  },
  "dependencies": {
    "@angular/common": "^18.0.0",
    "@angular/compiler": "^18.0.0",
    "@angular/core": "^18.0.0",
    "@angular/platform-browser": "^18.0.0",
    "rxjs": "^7.8.1",
    "zone.js": "^0.14.0"
  },
  "devDependencies": {
    "@angular/cli": "^18.0.0",
    "@angular-devkit/build-angular": "^18.0.0",
    "typescript": "^5.4.0"
  }
}
"#;

const ANGULAR_JSON: &str = r#"{
  "$schema": "./node_modules/@angular/cli/lib/config/schema.json",
  "version": 1,
  "projects": {
    "{{name}}": {
      "projectType": "application",
      "root": "",
      "sourceRoot": "src",
      "architect": {
        "build": {
          "builder": "@angular-devkit/build-angular:application",
          "options": {
            "outputPath": "dist",
            "index": "src/index.html",
            "browser": "src/main.ts",
            "tsConfig": "tsconfig.json"
          }
        }
      }
    }
  }
}
"#;

const ANGULAR_INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>{{name}}</title>
  </head>
  <body>
    <app-root></app-root>
  </body>
</html>
"#;

const ANGULAR_MAIN: &str = r#"import { bootstrapApplication } from '@angular/platform-browser';
import { AppComponent } from './app/app.component';

bootstrapApplication(AppComponent).catch((err) => console.error(err));
"#;

const ANGULAR_APP_COMPONENT: &str = r#"import { Component } from '@angular/core';

@Component({
  selector: 'app-root',
  standalone: true,
  template: '<h1>{{name}}</h1>',
})
export class AppComponent {}
"#;

const WEB_TSCONFIG: &str = r#"{
  "compilerOptions": {
    "target": "ES2022",
    "module": "ES2022",
    "moduleResolution": "bundler",
    "strict": true,
    "jsx": "react-jsx",
    "experimentalDecorators": true,
    "skipLibCheck": true
  },
  "include": ["src"]
}
"#;

const REACT_PACKAGE_JSON: &str = r#"{
  "name": "{{name}}",
  "version": "0.0.0",
  "private": true,
  "type": "module",
  "scripts": {
    "build": "vite build",
    "dev": "vite"
  },
  "dependencies": {
    "react": "^18.3.0",
    "react-dom": "^18.3.0"
  },
  "devDependencies": {
    "@types/react": "^18.3.0",
    "@types/react-dom": "^18.3.0",
    "@vitejs/plugin-react": "^4.3.0",
    "typescript": "^5.4.0",
    "vite": "^5.3.0"
  }
}
"#;

const REACT_VITE_CONFIG: &str = r#"import { defineConfig } from 'vite';
import react from '@vitejs/plugin-react';

export default defineConfig({
  plugins: [react()],
  build: { outDir: 'dist' },
});
"#;

const REACT_INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>{{name}}</title>
  </head>
  <body>
    <div id="root"></div>
    <script type="module" src="/src/main.tsx"></script>
  </body>
</html>
"#;

const REACT_MAIN: &str = r#"import { StrictMode } from 'react';
import { createRoot } from 'react-dom/client';
import App from './App';

createRoot(document.getElementById('root')!).render(
  <StrictMode>
    <App />
  </StrictMode>,
);
"#;

const REACT_APP: &str = r#"export default function App() {
  return <h1>{{name}}</h1>;
}
"#;
